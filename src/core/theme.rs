use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(format!("unknown theme '{other}' (expected light, dark or system)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Theme {
    pub mode: ThemeMode,
}

impl Theme {
    pub fn new(mode: ThemeMode) -> Self {
        Self { mode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_as_mode_object() {
        let json = serde_json::to_string(&Theme::new(ThemeMode::Dark)).unwrap();
        assert_eq!(json, r#"{"mode":"dark"}"#);
        let back: Theme = serde_json::from_str(r#"{"mode":"light"}"#).unwrap();
        assert_eq!(back.mode, ThemeMode::Light);
    }

    #[test]
    fn defaults_to_system() {
        assert_eq!(Theme::default().mode, ThemeMode::System);
        assert_eq!("System".parse::<ThemeMode>(), Ok(ThemeMode::System));
    }
}
