//! Error types for simple-storage.

use simple_storage_core::ValidationError;
use simple_storage_store::StoreError;
use thiserror::Error;

/// Errors from opening or configuring storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for simple-storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
