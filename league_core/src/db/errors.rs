//! Storage port errors.

use std::time::Duration;
use thiserror::Error;

use super::timeouts::QueryError;

/// Errors reported by repository implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced row does not exist
    #[error("Record not found")]
    NotFound,

    /// Version check or uniqueness constraint failed
    #[error("Record was modified concurrently")]
    Conflict,

    /// Insert-once key was already present
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Row is still referenced by the named table
    #[error("Record is still referenced by {0}")]
    Referenced(&'static str),

    /// Stored value cannot be represented in the domain model
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<QueryError> for StoreError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Elapsed(after) => StoreError::Timeout(after),
            QueryError::Sql(e) => StoreError::Database(e),
        }
    }
}

/// Result type for repository operations
pub type StoreResult<T> = Result<T, StoreError>;
