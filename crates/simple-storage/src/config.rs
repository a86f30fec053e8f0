//! Storage configuration.
//!
//! A [`StorageConfig`] names the collection to open and picks a backend.
//! It can be built in code or deserialized from JSON:
//!
//! ```json
//! {
//!   "database": "MyCache",
//!   "collection": "Users",
//!   "version": 2,
//!   "backend": { "kind": "prefer_sqlite", "root": "data" }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use simple_storage_core::{validate_name, KeyPath, SchemaVersion};
use simple_storage_store::SqliteOptions;

use crate::error::{Result, StorageError};

/// Directory used for SQLite files when none is configured.
pub const DEFAULT_ROOT: &str = "simple-storage";

/// Busy timeout used when none is configured.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Configuration for one storage facade.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageConfig {
    /// Logical database name.
    pub database: String,
    /// Collection within the database.
    pub collection: String,
    /// Field holding the primary key.
    #[serde(default)]
    pub key_path: KeyPath,
    /// Initial schema version.
    #[serde(default)]
    pub version: SchemaVersion,
    /// Where records are kept.
    #[serde(default)]
    pub backend: BackendConfig,
}

impl StorageConfig {
    /// Config for `collection` in `database` with key path `id`, version 1
    /// and the default backend.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            key_path: KeyPath::default(),
            version: SchemaVersion::default(),
            backend: BackendConfig::default(),
        }
    }

    pub fn with_key_path(mut self, key_path: impl Into<KeyPath>) -> Self {
        self.key_path = key_path.into();
        self
    }

    pub fn with_version(mut self, version: SchemaVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StorageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check names before anything is opened.
    pub fn validate(&self) -> Result<()> {
        validate_name("database", &self.database)?;
        validate_name("collection", &self.collection)?;
        if self.key_path.as_str().is_empty() {
            return Err(StorageError::Config("key_path must not be empty".into()));
        }
        Ok(())
    }
}

/// Which backend holds the records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// SQLite files under `root`.
    Sqlite {
        #[serde(default = "default_root")]
        root: PathBuf,
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
    /// Process-wide in-memory slots.
    MemorySlots,
    /// Slot files under `dir`.
    FileSlots { dir: PathBuf },
    /// SQLite if `root` is usable when the storage is opened, otherwise
    /// in-memory slots. Decided once; later failures are not retried on the
    /// other backend.
    PreferSqlite {
        #[serde(default = "default_root")]
        root: PathBuf,
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

impl BackendConfig {
    pub fn sqlite(root: impl Into<PathBuf>) -> Self {
        BackendConfig::Sqlite {
            root: root.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn prefer_sqlite(root: impl Into<PathBuf>) -> Self {
        BackendConfig::PreferSqlite {
            root: root.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn file_slots(dir: impl Into<PathBuf>) -> Self {
        BackendConfig::FileSlots { dir: dir.into() }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::prefer_sqlite(DEFAULT_ROOT)
    }
}

pub(crate) fn sqlite_options(busy_timeout_ms: u64) -> SqliteOptions {
    SqliteOptions {
        busy_timeout: Duration::from_millis(busy_timeout_ms),
    }
}
