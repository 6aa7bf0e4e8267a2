//! Storage error types.

use thiserror::Error;

/// Errors from cart persistence operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The persistence backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A persisted cart could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
