//! # Simple Storage Core
//!
//! Pure types for simple-storage: records, keys, schema versions and delete
//! selectors.
//!
//! This crate contains no I/O. Backends live in `simple-storage-store`.
//!
//! ## Key Types
//!
//! - [`Record`] - A structured value stored in a collection
//! - [`Key`] - Scalar primary key (integer or text) taken from a record field
//! - [`KeyPath`] - Name of the field that holds the primary key
//! - [`SchemaVersion`] - Validated positive schema version
//! - [`DeleteSelector`] - Either a single key or a predicate over records

pub mod error;
pub mod selector;
pub mod types;
pub mod validation;
pub mod version;

pub use error::ValidationError;
pub use selector::{DeleteSelector, Predicate};
pub use types::{Key, KeyPath, Record};
pub use validation::{validate_name, validate_record};
pub use version::{SchemaVersion, VersionCell};
