//! SQLite implementation of the Storage trait.
//!
//! This is the primary backend. Every operation opens its own connection,
//! runs one transaction scope and closes the connection again. The blocking
//! work happens on tokio's blocking pool via `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use simple_storage_core::{
    validate_name, validate_record, DeleteSelector, Key, KeyPath, Record, SchemaVersion,
    VersionCell,
};
use tracing::debug;

use crate::connection::{ConnectionManager, SqliteOptions};
use crate::cursor;
use crate::error::{Result, StoreError};
use crate::migration::CollectionSchema;
use crate::scope::{scope, CollectionHandle, ScopeMode};
use crate::traits::Storage;

/// SQLite-backed storage for one collection of one database.
///
/// Construction performs no I/O; the database file and the collection are
/// created by the first operation.
pub struct SqliteStorage {
    manager: Arc<ConnectionManager>,
    database: String,
    collection: String,
    key_path: KeyPath,
    version: VersionCell,
}

impl SqliteStorage {
    /// Storage for `collection` in `database`, with files under `root`.
    ///
    /// Uses key path `id`, version 1 and default SQLite options.
    pub fn new(
        root: impl Into<PathBuf>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self> {
        let database = database.into();
        let collection = collection.into();
        validate_name("database", &database)?;
        validate_name("collection", &collection)?;

        Ok(Self {
            manager: Arc::new(ConnectionManager::new(root, SqliteOptions::default())),
            database,
            collection,
            key_path: KeyPath::default(),
            version: VersionCell::new(SchemaVersion::INITIAL),
        })
    }

    pub fn with_key_path(mut self, key_path: impl Into<KeyPath>) -> Self {
        self.key_path = key_path.into();
        self
    }

    pub fn with_version(self, version: SchemaVersion) -> Self {
        self.version.set(version);
        self
    }

    pub fn with_options(mut self, options: SqliteOptions) -> Self {
        let root = self.manager.root().to_path_buf();
        self.manager = Arc::new(ConnectionManager::new(root, options));
        self
    }

    /// Directory holding the database files.
    pub fn root(&self) -> &Path {
        self.manager.root()
    }

    /// File backing this storage's database.
    pub fn database_path(&self) -> PathBuf {
        self.manager.database_path(&self.database)
    }

    /// Open a connection, run `work` in a scope and release the connection.
    async fn run<T, F>(&self, mode: ScopeMode, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CollectionHandle<'_>) -> Result<T> + Send + 'static,
    {
        let manager = self.manager.clone();
        let database = self.database.clone();
        let collection = self.collection.clone();
        let key_path = self.key_path.clone();
        let version = self.version();

        tokio::task::spawn_blocking(move || {
            let schema = CollectionSchema {
                name: &collection,
                key_path: &key_path,
            };
            let conn = manager.open(&database, schema, Some(version))?;
            scope(conn, &collection, mode).run(work)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    fn database(&self) -> &str {
        &self.database
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    fn version(&self) -> SchemaVersion {
        self.version.get()
    }

    fn set_version(&self, version: SchemaVersion) {
        self.version.set(version);
    }

    async fn set(&self, record: Record) -> Result<()> {
        let key = validate_record(&record, &self.key_path)?;
        debug!(database = %self.database, collection = %self.collection, key = %key, "set");
        self.run(ScopeMode::ReadWrite, move |h| h.put(&key, &record))
            .await
    }

    async fn get(&self, key: &Key) -> Result<Option<Record>> {
        let key = key.clone();
        self.run(ScopeMode::ReadOnly, move |h| h.get(&key)).await
    }

    async fn count(&self) -> Result<usize> {
        self.run(ScopeMode::ReadOnly, |h| h.count()).await
    }

    async fn delete(&self, selector: DeleteSelector) -> Result<()> {
        match selector {
            DeleteSelector::Key(key) => {
                let existed = self
                    .run(ScopeMode::ReadWrite, move |h| h.delete(&key))
                    .await?;
                debug!(collection = %self.collection, existed, "delete by key");
            }
            DeleteSelector::Predicate(predicate) => {
                let deleted = self
                    .run(ScopeMode::ReadWrite, move |h| {
                        cursor::delete_where(h, |record| predicate(record))
                    })
                    .await?;
                debug!(collection = %self.collection, deleted, "delete by predicate");
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        debug!(database = %self.database, collection = %self.collection, "clear");
        self.run(ScopeMode::ReadWrite, |h| h.clear()).await
    }
}
