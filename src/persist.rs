use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::filters::SearchFilters;
use crate::core::note::Note;
use crate::core::task::Task;
use crate::core::theme::Theme;
use crate::core::user::User;
use crate::error::PersistError;

pub const DEFAULT_STORAGE_KEY: &str = "notes-app-storage";

/// A named text-blob store: the local equivalent of browser local storage.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        // The previous blob stays in place until the new one is fully written.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        match std::fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(key: &str, value: impl Into<String>) -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(key.to_string(), value.into());
        Self { blobs }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.blobs.remove(key);
        Ok(())
    }
}

/// The persisted subset of store state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    pub notes: Vec<Note>,
    pub tasks: Vec<Task>,
    pub theme: Theme,
    pub search_filters: SearchFilters,
    pub user: Option<User>,
}

impl PersistedState {
    /// Ids must be unique within each collection.
    pub fn validate(&self) -> Result<(), PersistError> {
        let mut seen = HashSet::new();
        for note in &self.notes {
            if !seen.insert(note.id.as_str()) {
                return Err(PersistError::Inconsistent(format!("duplicate note id '{}'", note.id)));
            }
        }
        seen.clear();
        for task in &self.tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(PersistError::Inconsistent(format!("duplicate task id '{}'", task.id)));
            }
        }
        Ok(())
    }
}

/// Decode and validate the blob under `key`, if any.
pub fn read_state<S: Storage>(storage: &S, key: &str) -> Result<Option<PersistedState>, PersistError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    let state: PersistedState = serde_json::from_str(&raw)?;
    state.validate()?;
    Ok(Some(state))
}

/// Load state for startup. Never fails: a malformed blob is removed and the
/// defaults are returned; an unreadable one is left alone.
pub fn load_state<S: Storage>(storage: &mut S, key: &str) -> PersistedState {
    match read_state(storage, key) {
        Ok(Some(state)) => {
            log::info!(
                "Loaded {} notes and {} tasks from '{}'",
                state.notes.len(),
                state.tasks.len(),
                key
            );
            state
        }
        Ok(None) => {
            log::info!("No persisted state under '{}', starting empty", key);
            PersistedState::default()
        }
        Err(PersistError::Io(e)) => {
            log::warn!("Failed to read persisted state '{}': {}", key, e);
            PersistedState::default()
        }
        Err(e) => {
            log::warn!("Discarding persisted state '{}': {}", key, e);
            if let Err(e) = storage.remove(key) {
                log::error!("Failed to remove persisted state '{}': {}", key, e);
            }
            PersistedState::default()
        }
    }
}

pub fn save_state<S: Storage>(storage: &mut S, key: &str, state: &PersistedState) -> Result<(), PersistError> {
    let json = serde_json::to_string(state)?;
    storage.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::note::NewNote;
    use crate::core::task::{NewTask, Priority};
    use crate::core::theme::ThemeMode;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    const KEY: &str = DEFAULT_STORAGE_KEY;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample_state() -> PersistedState {
        let note = Note::from_draft("n1".into(), NewNote::new("Groceries", "milk, eggs"), at(0));
        let mut task = Task::from_draft(
            "t1".into(),
            NewTask {
                priority: Priority::High,
                due_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                ..NewTask::new("Pay rent")
            },
            at(5),
        );
        task.toggle_complete(at(9));
        PersistedState {
            notes: vec![note],
            tasks: vec![task],
            theme: Theme::new(ThemeMode::Dark),
            search_filters: SearchFilters::default(),
            user: Some(crate::session::demo_user(at(1))),
        }
    }

    #[test]
    fn round_trip_restores_timestamps() {
        let mut storage = MemoryStorage::new();
        let state = sample_state();
        save_state(&mut storage, KEY, &state).unwrap();

        let raw = storage.get(KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["notes"][0]["createdAt"].is_string());
        assert!(value["searchFilters"].is_object());

        let loaded = load_state(&mut storage, KEY);
        assert_eq!(loaded, state);
        assert!(loaded.tasks[0].completed_at.unwrap() > loaded.tasks[0].created_at);
    }

    #[test]
    fn missing_blob_yields_defaults() {
        let mut storage = MemoryStorage::new();
        assert_eq!(load_state(&mut storage, KEY), PersistedState::default());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let mut storage = MemoryStorage::with_blob(KEY, r#"{"theme":{"mode":"light"}}"#);
        let state = load_state(&mut storage, KEY);
        assert_eq!(state.theme.mode, ThemeMode::Light);
        assert!(state.notes.is_empty());
        assert!(state.user.is_none());
    }

    #[test]
    fn unparseable_dates_discard_blob() {
        let blob = r#"{
            "notes": [{
                "id": "n1", "title": "t", "content": "c", "userId": "u",
                "tags": [], "isPinned": false, "isArchived": false,
                "createdAt": "yesterday", "updatedAt": "yesterday",
                "lastAccessedAt": "yesterday", "accessCount": 0
            }],
            "tasks": [], "theme": {"mode": "dark"}
        }"#;
        let mut storage = MemoryStorage::with_blob(KEY, blob);
        let state = load_state(&mut storage, KEY);
        assert_eq!(state, PersistedState::default());
        assert!(storage.get(KEY).unwrap().is_none());
    }

    #[test]
    fn invalid_json_discards_blob() {
        let mut storage = MemoryStorage::with_blob(KEY, "{not json");
        assert_eq!(load_state(&mut storage, KEY), PersistedState::default());
        assert!(storage.get(KEY).unwrap().is_none());
    }

    #[test]
    fn duplicate_ids_are_inconsistent() {
        let mut state = sample_state();
        state.notes.push(state.notes[0].clone());
        let mut storage = MemoryStorage::new();
        save_state(&mut storage, KEY, &state).unwrap();

        assert!(matches!(read_state(&storage, KEY), Err(PersistError::Inconsistent(_))));
        assert_eq!(load_state(&mut storage, KEY), PersistedState::default());
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert!(storage.get(KEY).unwrap().is_none());

        let state = sample_state();
        save_state(&mut storage, KEY, &state).unwrap();
        assert!(storage.path_for(KEY).exists());
        assert_eq!(load_state(&mut storage, KEY), state);

        storage.remove(KEY).unwrap();
        assert!(!storage.path_for(KEY).exists());
        storage.remove(KEY).unwrap();
    }

    #[test]
    fn file_storage_discards_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        std::fs::write(storage.path_for(KEY), r#"{"notes": "oops"}"#).unwrap();

        assert_eq!(load_state(&mut storage, KEY), PersistedState::default());
        assert!(!storage.path_for(KEY).exists());
    }

    #[test]
    fn file_storage_failed_write_keeps_previous_blob() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        let state = sample_state();
        save_state(&mut storage, KEY, &state).unwrap();
        assert!(!dir.path().join(format!("{KEY}.json.tmp")).exists());

        // A directory squatting on the staging path makes the next write fail.
        std::fs::create_dir(dir.path().join(format!("{KEY}.json.tmp"))).unwrap();
        let mut changed = state.clone();
        changed.notes.clear();
        assert!(save_state(&mut storage, KEY, &changed).is_err());

        assert_eq!(load_state(&mut storage, KEY), state);
        assert!(storage.path_for(KEY).exists());
    }
}
