//! # Store: the single owner of notes, tasks and session state
//!
//! [`Store`] holds the persisted state (notes, tasks, theme, last search,
//! user) plus two transient UI flags, and is handed by value or reference
//! to whatever drives it. Every mutation that changes something is written
//! straight back to its [`Storage`] under one key; a mutation on an id that
//! does not exist changes nothing, writes nothing and returns `false`.
//!
//! ## Derived views
//!
//! | Method | Result |
//! |--------|--------|
//! | [`recent_notes`](Store::recent_notes) | Non-archived notes, newest access first, at most 5. |
//! | [`most_used_notes`](Store::most_used_notes) | Non-archived notes, highest access count first, at most 5. |
//! | [`pinned_notes`](Store::pinned_notes) | Pinned, non-archived notes in collection order. |
//! | [`pinned_tasks`](Store::pinned_tasks) | Pinned tasks. |
//! | [`completed_tasks`](Store::completed_tasks) / [`pending_tasks`](Store::pending_tasks) | Tasks split by completion. |
//! | [`filtered_notes`](Store::filtered_notes) / [`filtered_tasks`](Store::filtered_tasks) | The current [`SearchFilters`] applied. |
//!
//! Views are recomputed on every call. Collections are newest-first by
//! insertion, so ties in the sorted views keep that order.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::core::filters::{SearchFilters, SearchFiltersPatch};
use crate::core::note::{NewNote, Note, NotePatch};
use crate::core::task::{NewTask, Task, TaskPatch};
use crate::core::theme::Theme;
use crate::core::user::User;
use crate::error::LookupError;
use crate::persist::{DEFAULT_STORAGE_KEY, PersistedState, Storage, load_state, save_state};
use crate::util::generate_id;

pub const RECENT_LIMIT: usize = 5;
pub const MOST_USED_LIMIT: usize = 5;

/// Source of "now" for timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct Store<S: Storage> {
    state: PersistedState,
    storage: S,
    key: String,
    clock: Box<dyn Clock>,
    is_loading: bool,
    error: Option<String>,
}

impl<S: Storage> Store<S> {
    /// Open the store under the default key, restoring whatever was persisted.
    pub fn open(storage: S) -> Self {
        Self::open_with(storage, DEFAULT_STORAGE_KEY, Box::new(SystemClock))
    }

    pub fn open_with(mut storage: S, key: impl Into<String>, clock: Box<dyn Clock>) -> Self {
        let key = key.into();
        let state = load_state(&mut storage, &key);
        Self {
            state,
            storage,
            key,
            clock,
            is_loading: false,
            error: None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn notes(&self) -> &[Note] {
        &self.state.notes
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn search_filters(&self) -> &SearchFilters {
        &self.state.search_filters
    }

    pub fn theme(&self) -> Theme {
        self.state.theme
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.state.notes.iter().find(|n| n.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.iter().find(|t| t.id == id)
    }

    /// Resolve a full note id or a unique prefix of one.
    pub fn find_note_id(&self, prefix: &str) -> Result<String, LookupError> {
        resolve_prefix("note", prefix, self.state.notes.iter().map(|n| n.id.as_str()))
    }

    /// Resolve a full task id or a unique prefix of one.
    pub fn find_task_id(&self, prefix: &str) -> Result<String, LookupError> {
        resolve_prefix("task", prefix, self.state.tasks.iter().map(|t| t.id.as_str()))
    }

    // ---- Session and UI flags ----

    pub fn set_user(&mut self, user: Option<User>) {
        match &user {
            Some(u) => log::info!("Signed in as {} <{}>", u.name, u.email),
            None => log::info!("Signed out"),
        }
        self.state.user = user;
        self.flush();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        log::debug!("Theme set to {}", theme.mode.as_str());
        self.state.theme = theme;
        self.flush();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    // ---- Notes ----

    /// Create a note at the front of the collection and return its id.
    pub fn add_note(&mut self, draft: NewNote) -> String {
        let id = fresh_id(|candidate| self.note(candidate).is_some());
        let note = Note::from_draft(id.clone(), draft, self.clock.now());
        log::debug!("Added note {} '{}'", note.id, note.title);
        self.state.notes.insert(0, note);
        self.flush();
        id
    }

    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> bool {
        let now = self.clock.now();
        let Some(note) = self.state.notes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        note.apply(patch);
        note.updated_at = advance(note.updated_at, now);
        log::debug!("Updated note {}", id);
        self.flush();
        true
    }

    pub fn delete_note(&mut self, id: &str) -> bool {
        let before = self.state.notes.len();
        self.state.notes.retain(|n| n.id != id);
        if self.state.notes.len() == before {
            return false;
        }
        log::debug!("Deleted note {}", id);
        self.flush();
        true
    }

    /// Flip the pinned flag. Leaves `updated_at` alone.
    pub fn pin_note(&mut self, id: &str) -> bool {
        self.with_note(id, |note, _| note.is_pinned = !note.is_pinned)
    }

    /// Flip the archived flag. Leaves `updated_at` alone.
    pub fn archive_note(&mut self, id: &str) -> bool {
        self.with_note(id, |note, _| note.is_archived = !note.is_archived)
    }

    pub fn increment_access_count(&mut self, id: &str) -> bool {
        self.with_note(id, |note, now| note.touch(now))
    }

    fn with_note(&mut self, id: &str, f: impl FnOnce(&mut Note, DateTime<Utc>)) -> bool {
        let now = self.clock.now();
        let Some(note) = self.state.notes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        f(note, now);
        log::debug!(
            "Note {}: pinned={} archived={} accesses={}",
            id,
            note.is_pinned,
            note.is_archived,
            note.access_count
        );
        self.flush();
        true
    }

    // ---- Tasks ----

    /// Create a task at the front of the collection and return its id.
    pub fn add_task(&mut self, draft: NewTask) -> String {
        let id = fresh_id(|candidate| self.task(candidate).is_some());
        let task = Task::from_draft(id.clone(), draft, self.clock.now());
        log::debug!("Added task {} '{}'", task.id, task.title);
        self.state.tasks.insert(0, task);
        self.flush();
        id
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> bool {
        self.with_task(id, |task, now| {
            task.apply(patch);
            task.updated_at = advance(task.updated_at, now);
        })
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|t| t.id != id);
        if self.state.tasks.len() == before {
            return false;
        }
        log::debug!("Deleted task {}", id);
        self.flush();
        true
    }

    /// Completing stamps `completed_at`; un-completing clears it. Always refreshes `updated_at`.
    pub fn toggle_task_complete(&mut self, id: &str) -> bool {
        self.with_task(id, |task, now| {
            let stamp = advance(task.updated_at, now);
            task.toggle_complete(stamp);
            task.updated_at = stamp;
        })
    }

    /// Flip the pinned flag. Leaves `updated_at` alone.
    pub fn pin_task(&mut self, id: &str) -> bool {
        self.with_task(id, |task, _| task.is_pinned = !task.is_pinned)
    }

    fn with_task(&mut self, id: &str, f: impl FnOnce(&mut Task, DateTime<Utc>)) -> bool {
        let now = self.clock.now();
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        f(task, now);
        log::debug!(
            "Task {}: completed={} pinned={}",
            id,
            task.is_completed,
            task.is_pinned
        );
        self.flush();
        true
    }

    // ---- Search ----

    pub fn set_search_filters(&mut self, patch: SearchFiltersPatch) {
        self.state.search_filters.apply(patch);
        self.flush();
    }

    pub fn clear_search_filters(&mut self) {
        self.state.search_filters = SearchFilters::default();
        self.flush();
    }

    /// Remove the persisted blob and reset everything to defaults.
    pub fn clear_all_data(&mut self) {
        if let Err(e) = self.storage.remove(&self.key) {
            log::error!("Failed to remove persisted state '{}': {}", self.key, e);
        }
        self.state = PersistedState::default();
        self.is_loading = false;
        self.error = None;
        log::info!("Cleared all data under '{}'", self.key);
    }

    // ---- Derived views ----

    pub fn recent_notes(&self) -> Vec<&Note> {
        let mut notes = self.active_notes();
        notes.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
        notes.truncate(RECENT_LIMIT);
        notes
    }

    pub fn most_used_notes(&self) -> Vec<&Note> {
        let mut notes = self.active_notes();
        notes.sort_by(|a, b| b.access_count.cmp(&a.access_count));
        notes.truncate(MOST_USED_LIMIT);
        notes
    }

    pub fn pinned_notes(&self) -> Vec<&Note> {
        self.state
            .notes
            .iter()
            .filter(|n| n.is_pinned && !n.is_archived)
            .collect()
    }

    pub fn pinned_tasks(&self) -> Vec<&Task> {
        self.state.tasks.iter().filter(|t| t.is_pinned).collect()
    }

    pub fn completed_tasks(&self) -> Vec<&Task> {
        self.state.tasks.iter().filter(|t| t.is_completed).collect()
    }

    pub fn pending_tasks(&self) -> Vec<&Task> {
        self.state.tasks.iter().filter(|t| !t.is_completed).collect()
    }

    pub fn filtered_notes(&self) -> Vec<&Note> {
        let filters = &self.state.search_filters;
        self.state.notes.iter().filter(|n| filters.matches_note(n)).collect()
    }

    pub fn filtered_tasks(&self) -> Vec<&Task> {
        let filters = &self.state.search_filters;
        self.state.tasks.iter().filter(|t| filters.matches_task(t)).collect()
    }

    /// Tags across non-archived notes and all tasks, most used first.
    pub fn tag_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let note_tags = self.active_notes().into_iter().flat_map(|n| n.tags.iter());
        let task_tags = self.state.tasks.iter().flat_map(|t| t.tags.iter());
        for tag in note_tags.chain(task_tags) {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
        let mut counts: Vec<(String, usize)> =
            counts.into_iter().map(|(tag, n)| (tag.to_string(), n)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    fn active_notes(&self) -> Vec<&Note> {
        self.state.notes.iter().filter(|n| !n.is_archived).collect()
    }

    fn flush(&mut self) {
        if let Err(e) = save_state(&mut self.storage, &self.key, &self.state) {
            log::error!("Failed to persist state '{}': {}", self.key, e);
        }
    }
}

fn fresh_id(taken: impl Fn(&str) -> bool) -> String {
    loop {
        let id = generate_id();
        if !taken(&id) {
            return id;
        }
    }
}

/// Next `updated_at`: `now`, or just past `previous` if the clock has not moved on.
fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn resolve_prefix<'a>(
    kind: &'static str,
    prefix: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<String, LookupError> {
    let mut matches = Vec::new();
    for id in ids {
        if id == prefix {
            return Ok(id.to_string());
        }
        if id.starts_with(prefix) {
            matches.push(id);
        }
    }
    match matches.as_slice() {
        [] => Err(LookupError::NotFound {
            kind,
            prefix: prefix.to_string(),
        }),
        [id] => Ok(id.to_string()),
        _ => Err(LookupError::Ambiguous {
            kind,
            prefix: prefix.to_string(),
            count: matches.len(),
        }),
    }
}
