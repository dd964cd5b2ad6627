//! Error types for the repository layer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur during repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No record at the requested (id, workspace, language, timeshift)
    #[error("Record not found: {content_type}/{id}")]
    RecordNotFound { content_type: String, id: i64 },

    /// No such content or config type in the active repository
    #[error("Content type not found: {0}")]
    ContentTypeNotFound(String),

    /// Content type has no registered definition
    #[error("No definition registered for {kind} type: {name}")]
    SchemaMissing { kind: String, name: String },

    /// Backing store unreachable or a bootstrap step failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Record validation failed at the storage boundary
    #[error("Record error: {0}")]
    Record(#[from] strata_core::CoreError),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error for stored rows or definitions
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid path provided
    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    /// Database error (when the postgres feature is enabled)
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP error (when the api feature is enabled)
    #[cfg(feature = "api")]
    #[error("API error: {0}")]
    Api(String),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Generic error
    #[error("Repository error: {0}")]
    Other(String),
}

#[cfg(feature = "api")]
impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            RepositoryError::StorageUnavailable(err.to_string())
        } else {
            RepositoryError::Api(err.to_string())
        }
    }
}
