//! Error types for simple-storage core.

use thiserror::Error;

/// Validation errors raised before any backend I/O is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record has no primary key field `{0}`")]
    MissingKey(String),

    #[error("primary key field `{field}` holds {found}, expected an integer or a string")]
    InvalidKey { field: String, found: String },

    #[error("schema version must be a positive integer, got {0}")]
    InvalidVersion(String),

    #[error("schema version {0} exceeds the maximum of 4294967295")]
    VersionOutOfRange(u64),

    #[error("record must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("invalid {kind} name {name:?}")]
    InvalidName { kind: &'static str, name: String },
}
