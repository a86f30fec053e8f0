//! # Simple Storage Store
//!
//! Storage abstraction for simple-storage. Provides a trait-based interface
//! for keeping records in named collections, with a SQLite implementation
//! and a slot-store fallback.
//!
//! ## Overview
//!
//! Callers program against the [`Storage`] trait. The primary
//! implementation is [`SqliteStorage`]; [`SlotStorage`] keeps each
//! collection as a JSON array inside a flat [`SlotStore`] for environments
//! where SQLite cannot be used.
//!
//! ## Key Types
//!
//! - [`Storage`] - The async trait for all storage operations
//! - [`SqliteStorage`] - SQLite-backed storage, one file per database
//! - [`SlotStorage`] - Fallback storage over a [`SlotStore`]
//! - [`MemorySlots`] / [`FileSlots`] - Slot stores in memory or on disk
//! - [`ConnectionManager`] - Opens databases and upgrades collections
//!
//! ## Usage
//!
//! ```rust,no_run
//! use simple_storage_core::{Key, Record};
//! use simple_storage_store::{SqliteStorage, Storage, StorageExt};
//!
//! async fn example() {
//!     let store = SqliteStorage::new("data", "MyCache", "Users").unwrap();
//!
//!     store.set(Record::new().with("id", 82).with("name", "Alexander")).await.unwrap();
//!     let user = store.get(&Key::from(82)).await.unwrap();
//!
//!     store.delete_where(|r| r.str_field("name") == Some("Alexander")).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **One connection per operation**: nothing stays open between calls
//! - **Versioned collections**: on SQLite a version change drops and
//!   recreates the collection; on slots it selects another slot
//! - **Upsert**: `set` replaces any record with the same key

pub mod connection;
pub mod cursor;
pub mod error;
pub mod fallback;
pub mod migration;
pub mod scope;
pub mod slots;
pub mod sqlite;
pub mod traits;

pub use connection::{ConnectionManager, DbConnection, SqliteOptions};
pub use cursor::Cursor;
pub use error::{Result, StoreError};
pub use fallback::SlotStorage;
pub use migration::{CollectionSchema, Upgrade};
pub use scope::{scope, CollectionHandle, ScopeMode, TransactionScope};
pub use slots::{FileSlots, MemorySlots, SlotStore};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageExt};
