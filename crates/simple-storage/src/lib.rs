//! # Simple Storage
//!
//! Uniform async key-value storage for structured records.
//!
//! ## Overview
//!
//! A storage facade is bound to a database name, a collection name and a
//! key path. It offers five operations, all async:
//!
//! - **set**: insert or overwrite a record by its primary key
//! - **get**: fetch a record by key
//! - **count**: number of records in the collection
//! - **delete**: remove one record by key or every record matching a predicate
//! - **clear**: empty the collection
//!
//! Records live in SQLite by default. Where SQLite cannot be used the same
//! contract is served from a flat slot store.
//!
//! ## Schema versions
//!
//! Each facade carries a positive schema version. Changing it points later
//! operations at an empty collection. SQLite drops and recreates the
//! collection; the slot fallback switches to another slot and leaves the old
//! one in place.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use simple_storage::{open_storage, BackendConfig, StorageConfig};
//! use simple_storage::core::{Key, Record};
//! use simple_storage::store::StorageExt;
//!
//! async fn example() {
//!     let config = StorageConfig::new("MyCache", "Users")
//!         .with_backend(BackendConfig::prefer_sqlite("data"));
//!     let users = open_storage(&config).unwrap();
//!
//!     users
//!         .set(Record::new().with("id", 82).with("name", "Alexander"))
//!         .await
//!         .unwrap();
//!     let found = users.get(&Key::from(82)).await.unwrap();
//!
//!     users.delete_key(82).await.unwrap();
//!     users.try_set_version(2i64).unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `simple_storage::core` - Records, keys, versions and validation
//! - `simple_storage::store` - The `Storage` trait and both backends

pub mod config;
pub mod error;
pub mod open;

// Re-export component crates
pub use simple_storage_core as core;
pub use simple_storage_store as store;

// Re-export main types for convenience
pub use config::{BackendConfig, StorageConfig};
pub use error::{Result, StorageError};
pub use open::{open_backend, open_storage, shared_memory_slots, BackendKind};

pub use simple_storage_core::{DeleteSelector, Key, KeyPath, Record, SchemaVersion};
pub use simple_storage_store::{Storage, StorageExt};
