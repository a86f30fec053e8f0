//! Error types for the store module.

use simple_storage_core::ValidationError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record or argument was rejected before any I/O.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A request against an open SQLite connection failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The database could not be opened or created.
    #[error("cannot open database {database}: {source}")]
    Open {
        database: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Another connection holds the lock needed to (re)create the collection.
    #[error("opening database {database} is blocked: {source}")]
    Blocked {
        database: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A write was attempted through a read-only scope.
    #[error("collection {0} was opened read-only")]
    ReadOnly(String),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lock guarding shared slots was poisoned by a panicking writer.
    #[error("slot store lock poisoned: {0}")]
    Poisoned(String),

    /// The blocking task running a request did not complete.
    #[error("storage task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error is a validation failure rather than a backend failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
