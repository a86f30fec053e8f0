//! Transaction scopes: one collection, one mode, one unit of work.
//!
//! A [`TransactionScope`] owns the connection it was created from. Running
//! it opens a transaction, hands a [`CollectionHandle`] to the caller's
//! closure, commits on success and closes the connection afterwards. On
//! failure the transaction rolls back and the connection is dropped, which
//! closes it. Either way the connection is released exactly once.

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use simple_storage_core::{Key, Record};
use tracing::{debug, warn};

use crate::connection::DbConnection;
use crate::cursor::Cursor;
use crate::error::{Result, StoreError};
use crate::migration::{quote_ident, table_name};

/// Access mode of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    ReadOnly,
    ReadWrite,
}

impl ScopeMode {
    fn behavior(self) -> TransactionBehavior {
        match self {
            // Readers take their shared lock on first read.
            ScopeMode::ReadOnly => TransactionBehavior::Deferred,
            // Writers take the write lock up front so two writers never
            // deadlock upgrading from a shared lock.
            ScopeMode::ReadWrite => TransactionBehavior::Immediate,
        }
    }
}

/// Scope a connection to one collection.
pub fn scope(conn: DbConnection, collection: &str, mode: ScopeMode) -> TransactionScope {
    TransactionScope {
        conn,
        collection: collection.to_string(),
        mode,
    }
}

/// A connection bound to one collection in one mode, not yet started.
pub struct TransactionScope {
    conn: DbConnection,
    collection: String,
    mode: ScopeMode,
}

impl TransactionScope {
    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    /// Run `work` inside a transaction and release the connection.
    ///
    /// Once the transaction has committed the result stands: a failure to
    /// close the connection afterwards is logged, not returned.
    pub fn run<T, F>(self, work: F) -> Result<T>
    where
        F: FnOnce(&CollectionHandle<'_>) -> Result<T>,
    {
        let TransactionScope {
            mut conn,
            collection,
            mode,
        } = self;

        let result = execute(&mut conn, &collection, mode, work);

        match result {
            Ok(value) => {
                let database = conn.database().to_string();
                if let Err(e) = conn.close() {
                    warn!(
                        database = %database,
                        collection = %collection,
                        error = %e,
                        "close failed after commit"
                    );
                }
                Ok(value)
            }
            Err(e) => {
                debug!(
                    database = conn.database(),
                    collection = %collection,
                    error = %e,
                    "scope failed, releasing connection"
                );
                drop(conn);
                Err(e)
            }
        }
    }
}

fn execute<T, F>(conn: &mut DbConnection, collection: &str, mode: ScopeMode, work: F) -> Result<T>
where
    F: FnOnce(&CollectionHandle<'_>) -> Result<T>,
{
    let tx = conn.inner.transaction_with_behavior(mode.behavior())?;

    let value = {
        let handle = CollectionHandle {
            tx: &tx,
            collection,
            table: quote_ident(&table_name(collection)),
            mode,
        };
        work(&handle)?
    };

    tx.commit()?;
    Ok(value)
}

/// Access to one collection inside a running scope.
pub struct CollectionHandle<'a> {
    tx: &'a Transaction<'a>,
    collection: &'a str,
    table: String,
    mode: ScopeMode,
}

impl<'a> CollectionHandle<'a> {
    pub fn collection(&self) -> &str {
        self.collection
    }

    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    /// Fetch a record by key.
    pub fn get(&self, key: &Key) -> Result<Option<Record>> {
        let bytes: Option<Vec<u8>> = self
            .tx
            .query_row(
                &format!("SELECT record FROM {} WHERE record_key = ?1", self.table),
                params![key_param(key)],
                |row| row.get(0),
            )
            .optional()?;

        bytes.map(|b| decode_record(&b)).transpose()
    }

    /// Insert or overwrite the record stored under `key`.
    pub fn put(&self, key: &Key, record: &Record) -> Result<()> {
        self.ensure_writable()?;
        let bytes = encode_record(record)?;
        self.tx.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (record_key, record) VALUES (?1, ?2)",
                self.table
            ),
            params![key_param(key), bytes],
        )?;
        Ok(())
    }

    /// Delete the record stored under `key`. Returns whether one existed.
    pub fn delete(&self, key: &Key) -> Result<bool> {
        self.ensure_writable()?;
        let changed = self.tx.execute(
            &format!("DELETE FROM {} WHERE record_key = ?1", self.table),
            params![key_param(key)],
        )?;
        Ok(changed > 0)
    }

    /// Remove every record.
    pub fn clear(&self) -> Result<()> {
        self.ensure_writable()?;
        self.tx
            .execute(&format!("DELETE FROM {}", self.table), [])?;
        Ok(())
    }

    /// Number of records.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.tx.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Open a cursor over every record in key order.
    pub fn cursor(&self) -> Cursor<'_, 'a> {
        Cursor::new(self)
    }

    /// The first record whose key is strictly greater than `after`, or the
    /// first record overall.
    pub(crate) fn next_after(&self, after: Option<&Key>) -> Result<Option<(Key, Record)>> {
        let row: Option<(SqlValue, Vec<u8>)> = match after {
            None => self
                .tx
                .query_row(
                    &format!(
                        "SELECT record_key, record FROM {} ORDER BY record_key LIMIT 1",
                        self.table
                    ),
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?,
            Some(key) => self
                .tx
                .query_row(
                    &format!(
                        "SELECT record_key, record FROM {} WHERE record_key > ?1
                         ORDER BY record_key LIMIT 1",
                        self.table
                    ),
                    params![key_param(key)],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?,
        };

        match row {
            None => Ok(None),
            Some((key, bytes)) => Ok(Some((key_from_sql(key)?, decode_record(&bytes)?))),
        }
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        match self.mode {
            ScopeMode::ReadWrite => Ok(()),
            ScopeMode::ReadOnly => Err(StoreError::ReadOnly(self.collection.to_string())),
        }
    }
}

fn key_param(key: &Key) -> ToSqlOutput<'_> {
    match key {
        Key::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
        Key::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
    }
}

fn key_from_sql(value: SqlValue) -> Result<Key> {
    match value {
        SqlValue::Integer(i) => Ok(Key::Integer(i)),
        SqlValue::Text(s) => Ok(Key::Text(s)),
        other => Err(StoreError::Serialization(format!(
            "unexpected key type: {:?}",
            other.data_type()
        ))),
    }
}

/// Encode a record as CBOR for the `record` column.
fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_record(bytes: &[u8]) -> Result<Record> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}
