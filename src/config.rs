use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::persist::{DEFAULT_STORAGE_KEY, FileStorage};

const APP_DIR: &str = "notepin";
const CONFIG_FILE: &str = "config.json";

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join(APP_DIR)
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NotepinConfig {
    #[serde(default = "default_data_dir")]
    pub data_directory: PathBuf,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for NotepinConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_dir(),
            storage_key: default_storage_key(),
            debug_logging: false,
        }
    }
}

impl NotepinConfig {
    /// `<config_dir>/notepin/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the config at `path`, falling back to defaults when it is missing or unusable.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.data_directory)
    }

    pub fn state_path(&self) -> PathBuf {
        self.storage().path_for(&self.storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NotepinConfig::load(&dir.path().join("absent.json"));
        assert_eq!(config, NotepinConfig::default());
        assert_eq!(config.storage_key, "notes-app-storage");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"debug_logging": true}"#).unwrap();

        let config = NotepinConfig::load(&path);
        assert!(config.debug_logging);
        assert_eq!(config.data_directory, default_data_dir());
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "debug_logging = true").unwrap();

        assert!(matches!(NotepinConfig::read(&path), Err(ConfigError::Malformed(_))));
        assert_eq!(NotepinConfig::load(&path), NotepinConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = NotepinConfig {
            data_directory: dir.path().join("data"),
            storage_key: "work".into(),
            debug_logging: true,
        };
        config.save(&path).unwrap();
        assert_eq!(NotepinConfig::load(&path), config);
        assert_eq!(config.state_path(), dir.path().join("data").join("work.json"));
    }
}
