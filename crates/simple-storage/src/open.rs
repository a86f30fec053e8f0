//! Opening storage from a [`StorageConfig`].

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use simple_storage_store::{
    ConnectionManager, FileSlots, MemorySlots, SlotStorage, SlotStore, SqliteStorage, Storage,
};
use tracing::{info, warn};

use crate::config::{sqlite_options, BackendConfig, StorageConfig};
use crate::error::Result;

/// The backend an opened storage ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    MemorySlots,
    FileSlots,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::MemorySlots => "memory_slots",
            BackendKind::FileSlots => "file_slots",
        };
        f.write_str(name)
    }
}

/// Slots shared by every memory-slot storage in the process.
pub fn shared_memory_slots() -> MemorySlots {
    static SLOTS: OnceLock<MemorySlots> = OnceLock::new();
    SLOTS.get_or_init(MemorySlots::new).clone()
}

/// Open the storage described by `config`.
pub fn open_storage(config: &StorageConfig) -> Result<Box<dyn Storage>> {
    open_backend(config).map(|(_, storage)| storage)
}

/// Open the storage described by `config` and report which backend it uses.
///
/// Only [`BackendConfig::PreferSqlite`] chooses: the SQLite root is probed
/// once, and in-memory slots are used if the probe fails.
pub fn open_backend(config: &StorageConfig) -> Result<(BackendKind, Box<dyn Storage>)> {
    config.validate()?;

    let opened: (BackendKind, Box<dyn Storage>) = match &config.backend {
        BackendConfig::Sqlite {
            root,
            busy_timeout_ms,
        } => (
            BackendKind::Sqlite,
            sqlite(config, root, *busy_timeout_ms)?,
        ),
        BackendConfig::MemorySlots => (
            BackendKind::MemorySlots,
            slots(config, shared_memory_slots())?,
        ),
        BackendConfig::FileSlots { dir } => (
            BackendKind::FileSlots,
            slots(config, FileSlots::open(dir)?)?,
        ),
        BackendConfig::PreferSqlite {
            root,
            busy_timeout_ms,
        } => {
            let probe = ConnectionManager::new(root, sqlite_options(*busy_timeout_ms)).probe();
            match probe {
                Ok(()) => (
                    BackendKind::Sqlite,
                    sqlite(config, root, *busy_timeout_ms)?,
                ),
                Err(e) => {
                    warn!(
                        root = %root.display(),
                        error = %e,
                        "sqlite unavailable, using memory slots"
                    );
                    (
                        BackendKind::MemorySlots,
                        slots(config, shared_memory_slots())?,
                    )
                }
            }
        }
    };

    info!(
        database = %config.database,
        collection = %config.collection,
        version = %config.version,
        backend = %opened.0,
        "storage opened"
    );
    Ok(opened)
}

fn sqlite(config: &StorageConfig, root: &Path, busy_timeout_ms: u64) -> Result<Box<dyn Storage>> {
    let storage = SqliteStorage::new(root, config.database.clone(), config.collection.clone())?
        .with_options(sqlite_options(busy_timeout_ms))
        .with_key_path(config.key_path.clone())
        .with_version(config.version);
    Ok(Box::new(storage))
}

fn slots<S>(config: &StorageConfig, store: S) -> Result<Box<dyn Storage>>
where
    S: SlotStore + 'static,
{
    let storage = SlotStorage::new(store, config.database.clone(), config.collection.clone())?
        .with_key_path(config.key_path.clone())
        .with_version(config.version);
    Ok(Box::new(storage))
}
