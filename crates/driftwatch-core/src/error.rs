//! Error types for driftwatch-core

use thiserror::Error;

/// Result type for driftwatch-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for driftwatch-core
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Subject or record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Invalid pillar name
    #[error("Invalid pillar: {0}")]
    InvalidPillar(String),

    /// Invalid drift level
    #[error("Invalid drift level: {0}")]
    InvalidDriftLevel(String),

    /// Backing store could not be brought up
    #[error("Initialization failed after {attempts} attempts: {message}")]
    Initialization { attempts: u32, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a missing subject
    pub fn subject_not_found(subject_id: i64) -> Self {
        Error::NotFound {
            entity: "Subject",
            id: subject_id.to_string(),
        }
    }

    /// Whether this error means the requested entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
