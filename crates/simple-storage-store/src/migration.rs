//! Collection schema management for SQLite.
//!
//! There are no incremental migrations. Each collection is stamped with the
//! schema version and key path it was created with, in a catalog table. When
//! a connection asks for a different version or key path, or the table has
//! gone missing, the collection is dropped and recreated empty.
//!
//! SQLite folds the case of table names, so a collection's table is named
//! from the hex encoding of the collection name (see [`table_name`]). Names
//! differing only in case get distinct tables.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use simple_storage_core::{KeyPath, SchemaVersion};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// Catalog of collections: one row per collection table.
pub const CATALOG_TABLE: &str = "__simple_storage_collections";

/// The collection a connection is opened for.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSchema<'a> {
    pub name: &'a str,
    pub key_path: &'a KeyPath,
}

/// What the catalog records for a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub key_path: String,
    pub version: u32,
}

/// Outcome of [`ensure_collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upgrade {
    /// The collection already matched.
    Unchanged,
    /// The collection did not exist and was created.
    Created,
    /// The collection existed under another version or key path and was
    /// recreated empty.
    Recreated { previous: u32 },
}

/// Prefix of collection table names.
const TABLE_PREFIX: &str = "c_";

/// Name of the table holding `collection`.
pub fn table_name(collection: &str) -> String {
    format!("{}{}", TABLE_PREFIX, hex::encode(collection))
}

/// Quote an identifier for use in SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Make sure `schema` exists at the requested version, recreating it if not.
///
/// With `requested = None` the currently stamped version is kept; a
/// collection that was never created is stamped with version 1.
///
/// The check runs once without locks. If an upgrade looks necessary, a write
/// transaction is taken and the check is repeated under the lock, so two
/// connections racing to upgrade never drop the collection twice.
pub fn ensure_collection(
    conn: &mut Connection,
    database: &str,
    schema: CollectionSchema<'_>,
    requested: Option<SchemaVersion>,
) -> Result<Upgrade> {
    let (_, needed) = plan(conn, schema, requested).map_err(|e| lock_error(database, e))?;
    if needed.is_none() {
        return Ok(Upgrade::Unchanged);
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| lock_error(database, e))?;

    let (target, needed) = plan(&tx, schema, requested).map_err(|e| lock_error(database, e))?;
    let Some(upgrade) = needed else {
        debug!(database, collection = schema.name, "upgrade already applied");
        return Ok(Upgrade::Unchanged);
    };

    apply(&tx, schema, target)?;
    tx.commit().map_err(|e| lock_error(database, e))?;

    match upgrade {
        Upgrade::Recreated { previous } => info!(
            database,
            collection = schema.name,
            previous,
            version = target,
            "collection recreated for new schema"
        ),
        _ => debug!(
            database,
            collection = schema.name,
            version = target,
            "collection created"
        ),
    }

    Ok(upgrade)
}

/// Read the catalog entry for a collection, if any.
pub fn catalog_entry(conn: &Connection, collection: &str) -> rusqlite::Result<Option<CatalogEntry>> {
    if !table_exists(conn, CATALOG_TABLE)? {
        return Ok(None);
    }

    conn.query_row(
        &format!(
            "SELECT key_path, version FROM {} WHERE name = ?1",
            quote_ident(CATALOG_TABLE)
        ),
        params![collection],
        |row| {
            Ok(CatalogEntry {
                key_path: row.get(0)?,
                version: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Decide the target version and whether the collection must be (re)created.
fn plan(
    conn: &Connection,
    schema: CollectionSchema<'_>,
    requested: Option<SchemaVersion>,
) -> rusqlite::Result<(u32, Option<Upgrade>)> {
    let entry = catalog_entry(conn, schema.name)?;
    let target = requested
        .map(SchemaVersion::get)
        .or(entry.as_ref().map(|e| e.version))
        .unwrap_or(SchemaVersion::INITIAL.get());

    let needed = match entry {
        None => Some(Upgrade::Created),
        Some(entry) => {
            let matches = entry.version == target
                && entry.key_path == schema.key_path.as_str()
                && table_exists(conn, &table_name(schema.name))?;
            if matches {
                None
            } else {
                Some(Upgrade::Recreated {
                    previous: entry.version,
                })
            }
        }
    };

    Ok((target, needed))
}

/// Drop and recreate the collection table, then stamp it in the catalog.
fn apply(conn: &Connection, schema: CollectionSchema<'_>, version: u32) -> Result<()> {
    let table = quote_ident(&table_name(schema.name));

    // The key column has no declared type, so integer and text keys are
    // stored and compared by storage class and never coerced into each other.
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {catalog} (
            name TEXT PRIMARY KEY,
            key_path TEXT NOT NULL,
            version INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        DROP TABLE IF EXISTS {table};

        CREATE TABLE {table} (
            record_key NOT NULL PRIMARY KEY,
            record BLOB NOT NULL
        ) WITHOUT ROWID;
        "#,
        catalog = quote_ident(CATALOG_TABLE),
        table = table,
    ))?;

    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO {} (name, key_path, version, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            quote_ident(CATALOG_TABLE)
        ),
        params![schema.name, schema.key_path.as_str(), version, now_millis()],
    )?;

    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Classify errors raised while checking or upgrading a collection.
///
/// Busy and locked mean another connection kept us from the write lock.
pub(crate) fn lock_error(database: &str, e: rusqlite::Error) -> StoreError {
    let busy = matches!(
        &e,
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    );

    if busy {
        warn!(database, error = %e, "database locked by another connection");
        StoreError::Blocked {
            database: database.to_string(),
            source: e,
        }
    } else {
        StoreError::Database(e)
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
