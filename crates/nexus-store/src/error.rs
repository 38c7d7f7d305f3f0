//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same key already exists.
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// Backend-specific fault (connection, serialization, ...).
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for nexus_core::NexusError {
    fn from(e: StoreError) -> Self {
        nexus_core::NexusError::Internal(e.to_string())
    }
}
