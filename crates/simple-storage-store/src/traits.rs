//! Storage trait: the backend-agnostic record store contract.
//!
//! Callers depend on this trait only. Implementations include SQLite
//! (primary) and a slot store (fallback).

use std::future::Future;

use async_trait::async_trait;
use simple_storage_core::{DeleteSelector, Key, KeyPath, Record, SchemaVersion, ValidationError};

use crate::error::Result;

/// The Storage trait: five async operations over one collection.
///
/// A storage instance is bound to a database name, a collection name and a
/// key path for its whole lifetime. Only the schema version is mutable.
///
/// # Design Notes
///
/// - **Self-contained operations**: every call acquires and releases its own
///   backend resources. Nothing is held between calls.
/// - **Upsert**: `set` overwrites a record with the same key.
/// - **Absence is not an error**: `get` returns `None`, `delete` of a missing
///   key or a predicate matching nothing succeeds without changes.
/// - **No ordering**: concurrent calls may be applied in any order. Await
///   each call to serialize them.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Logical database name.
    fn database(&self) -> &str;

    /// Collection name within the database.
    fn collection(&self) -> &str;

    /// Field holding each record's primary key.
    fn key_path(&self) -> &KeyPath;

    /// Current schema version.
    fn version(&self) -> SchemaVersion;

    /// Re-target subsequent operations at another schema version.
    ///
    /// Performs no I/O.
    fn set_version(&self, version: SchemaVersion);

    /// Insert or overwrite a record.
    ///
    /// Fails with a validation error if the key field is missing.
    async fn set(&self, record: Record) -> Result<()>;

    /// Fetch a record by key.
    async fn get(&self, key: &Key) -> Result<Option<Record>>;

    /// Number of records in the collection.
    async fn count(&self) -> Result<usize>;

    /// Delete one record by key, or every record matching a predicate.
    async fn delete(&self, selector: DeleteSelector) -> Result<()>;

    /// Remove all records, keeping the collection itself.
    async fn clear(&self) -> Result<()>;
}

/// Extension trait for common storage patterns.
pub trait StorageExt: Storage {
    /// Validate and set the schema version.
    ///
    /// On failure the previous version stays in effect.
    fn try_set_version<V>(&self, value: V) -> std::result::Result<(), ValidationError>
    where
        V: TryInto<SchemaVersion, Error = ValidationError>;

    /// Delete a single record by key.
    fn delete_key<K>(&self, key: K) -> impl Future<Output = Result<()>> + Send
    where
        K: Into<Key> + Send;

    /// Delete every record for which `predicate` returns `true`.
    fn delete_where<F>(&self, predicate: F) -> impl Future<Output = Result<()>> + Send
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static;
}

impl<S: Storage + ?Sized> StorageExt for S {
    fn try_set_version<V>(&self, value: V) -> std::result::Result<(), ValidationError>
    where
        V: TryInto<SchemaVersion, Error = ValidationError>,
    {
        let version = value.try_into()?;
        self.set_version(version);
        Ok(())
    }

    async fn delete_key<K>(&self, key: K) -> Result<()>
    where
        K: Into<Key> + Send,
    {
        self.delete(DeleteSelector::Key(key.into())).await
    }

    async fn delete_where<F>(&self, predicate: F) -> Result<()>
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.delete(DeleteSelector::matching(predicate)).await
    }
}
