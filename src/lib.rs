pub mod config;
pub mod core;
pub mod error;
pub mod persist;
pub mod session;
pub mod store;
pub mod util;

use std::sync::atomic::{AtomicBool, Ordering};

pub use error::{ConfigError, LookupError, PersistError};
pub use persist::{FileStorage, MemoryStorage, Storage};
pub use store::{Clock, Store, SystemClock};

/// Whether debug logging is active, shared between the logger filter and the config.
static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

pub fn set_debug_logging(enabled: bool) {
    DEBUG_LOGGING.store(enabled, Ordering::Relaxed);
}

pub fn debug_logging() -> bool {
    DEBUG_LOGGING.load(Ordering::Relaxed)
}
