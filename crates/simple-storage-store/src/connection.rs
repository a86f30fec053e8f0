//! Connection manager: opens a named database at a schema version.
//!
//! Every database is one SQLite file under a root directory. Opening makes
//! sure the requested collection exists at the requested version (see
//! [`crate::migration`]) before the connection is handed out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use simple_storage_core::{validate_name, SchemaVersion};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::migration::{self, CollectionSchema, Upgrade};

/// File extension of database files.
pub const DATABASE_EXTENSION: &str = "sqlite3";

/// Tuning for SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// How long a connection waits for a lock held by another connection
    /// before the request fails (an upgrade failing this way is reported as
    /// blocked).
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// An open connection to one database, ready for a single unit of work.
///
/// Closed explicitly by the transaction scope; dropping it also closes the
/// underlying SQLite handle.
pub struct DbConnection {
    pub(crate) inner: Connection,
    database: String,
    upgrade: Upgrade,
}

impl DbConnection {
    pub fn database(&self) -> &str {
        &self.database
    }

    /// What opening this connection did to the collection.
    pub fn upgrade(&self) -> Upgrade {
        self.upgrade
    }

    /// Close the connection, reporting any error from SQLite.
    pub fn close(self) -> Result<()> {
        let database = self.database;
        self.inner.close().map_err(|(_, e)| StoreError::Database(e))?;
        debug!(database = %database, "connection released");
        Ok(())
    }
}

/// Opens databases under a root directory.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    root: PathBuf,
    options: SqliteOptions,
}

impl ConnectionManager {
    pub fn new(root: impl Into<PathBuf>, options: SqliteOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    /// Path of the file backing `database`.
    pub fn database_path(&self, database: &str) -> PathBuf {
        self.root.join(format!("{}.{}", database, DATABASE_EXTENSION))
    }

    /// Check that the root directory can hold databases.
    ///
    /// Creates the directory and writes and removes a probe file.
    pub fn probe(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let probe = self.root.join(".simple-storage-probe");
        std::fs::write(&probe, b"probe")?;
        std::fs::remove_file(&probe)?;
        Ok(())
    }

    /// Open `database` with `schema` present at `version`.
    ///
    /// `version = None` keeps whatever version the collection is stamped
    /// with. Fails with [`StoreError::Open`] if the file cannot be opened
    /// and [`StoreError::Blocked`] if another connection holds the lock the
    /// upgrade needs. Neither is retried.
    pub fn open(
        &self,
        database: &str,
        schema: CollectionSchema<'_>,
        version: Option<SchemaVersion>,
    ) -> Result<DbConnection> {
        validate_name("database", database)?;
        validate_name("collection", schema.name)?;

        std::fs::create_dir_all(&self.root)?;
        let path = self.database_path(database);

        let open_error = |source| StoreError::Open {
            database: database.to_string(),
            source,
        };

        let mut conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_error)?;
        conn.busy_timeout(self.options.busy_timeout)
            .map_err(open_error)?;

        // SQLite opens lazily; touch the schema so unreadable or corrupt
        // files fail here rather than on the first request.
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| match migration::lock_error(database, e) {
                StoreError::Database(source) => open_error(source),
                blocked => blocked,
            })?;

        debug!(
            database,
            collection = schema.name,
            version = ?version,
            "connection opened"
        );

        let upgrade = migration::ensure_collection(&mut conn, database, schema, version)?;

        Ok(DbConnection {
            inner: conn,
            database: database.to_string(),
            upgrade,
        })
    }
}
