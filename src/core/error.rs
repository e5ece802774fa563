use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Canonical document not found at {}", .0.display())]
    CanonicalNotFound(PathBuf),
    #[error("Canonical document unreadable at {}: {source}", path.display())]
    CanonicalUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        ResolveError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ResolveError {
    fn from(err: serde_yaml::Error) -> Self {
        ResolveError::SerializationError(err.to_string())
    }
}
