use thiserror::Error;

/// Failures reading, writing or decoding the persisted state blob.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed persisted state: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("inconsistent persisted state: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Resolving a user-typed id or id prefix against a collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no {kind} matches '{prefix}'")]
    NotFound { kind: &'static str, prefix: String },
    #[error("'{prefix}' matches {count} {kind}s, type more of the id")]
    Ambiguous {
        kind: &'static str,
        prefix: String,
        count: usize,
    },
}
