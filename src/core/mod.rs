pub mod filters;
pub mod note;
pub mod task;
pub mod theme;
pub mod user;

pub use filters::{DateRange, Scope, SearchFilters, SearchFiltersPatch, StatusFilter};
pub use note::{NewNote, Note, NotePatch};
pub use task::{NewTask, Priority, Task, TaskPatch};
pub use theme::{Theme, ThemeMode};
pub use user::User;
