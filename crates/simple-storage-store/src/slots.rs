//! Slot stores: flat string-to-string maps backing the fallback storage.
//!
//! A slot store behaves like a browser's local storage. Values are opaque
//! strings addressed by name, and nothing is structured or transactional
//! beyond a single slot.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{Result, StoreError};

/// Callback for [`SlotStore::update_item`]. Receives the current value and
/// returns the new one, or `None` to leave the slot untouched.
pub type SlotUpdate<'a> = &'a mut dyn FnMut(Option<&str>) -> Result<Option<String>>;

/// A synchronous name to string map.
pub trait SlotStore: Send + Sync {
    fn get_item(&self, name: &str) -> Result<Option<String>>;

    fn set_item(&self, name: &str, value: &str) -> Result<()>;

    fn remove_item(&self, name: &str) -> Result<()>;

    /// Names of every slot currently present.
    fn slot_names(&self) -> Result<Vec<String>>;

    /// Read-modify-write of a single slot.
    ///
    /// The default reads and writes separately; implementations that can
    /// hold a lock across both override it.
    fn update_item(&self, name: &str, update: SlotUpdate<'_>) -> Result<()> {
        let current = self.get_item(name)?;
        if let Some(next) = update(current.as_deref())? {
            self.set_item(name, &next)?;
        }
        Ok(())
    }
}

impl<T: SlotStore + ?Sized> SlotStore for Arc<T> {
    fn get_item(&self, name: &str) -> Result<Option<String>> {
        (**self).get_item(name)
    }

    fn set_item(&self, name: &str, value: &str) -> Result<()> {
        (**self).set_item(name, value)
    }

    fn remove_item(&self, name: &str) -> Result<()> {
        (**self).remove_item(name)
    }

    fn slot_names(&self) -> Result<Vec<String>> {
        (**self).slot_names()
    }

    fn update_item(&self, name: &str, update: SlotUpdate<'_>) -> Result<()> {
        (**self).update_item(name, update)
    }
}

/// Process-local slots. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemorySlots {
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, String>>> {
        self.slots
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, String>>> {
        self.slots
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl SlotStore for MemorySlots {
    fn get_item(&self, name: &str) -> Result<Option<String>> {
        Ok(self.read()?.get(name).cloned())
    }

    fn set_item(&self, name: &str, value: &str) -> Result<()> {
        self.write()?.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, name: &str) -> Result<()> {
        self.write()?.remove(name);
        Ok(())
    }

    fn slot_names(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn update_item(&self, name: &str, update: SlotUpdate<'_>) -> Result<()> {
        let mut slots = self.write()?;
        if let Some(next) = update(slots.get(name).map(String::as_str))? {
            slots.insert(name.to_string(), next);
        }
        Ok(())
    }
}

/// Slots persisted as files in a directory, one file per slot.
///
/// File names are the hex encoding of the slot name, so any slot name is
/// safe on disk. Writes go to a temporary file that is then renamed over
/// the slot.
#[derive(Debug)]
pub struct FileSlots {
    dir: PathBuf,
    lock: Mutex<()>,
}

const SLOT_EXTENSION: &str = "slot";

impl FileSlots {
    /// Use `dir` for slot files, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", hex::encode(name), SLOT_EXTENSION))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn read_slot(&self, name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.slot_path(name)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_slot(&self, name: &str, value: &str) -> Result<()> {
        let path = self.slot_path(name);
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl SlotStore for FileSlots {
    fn get_item(&self, name: &str) -> Result<Option<String>> {
        let _guard = self.guard()?;
        self.read_slot(name)
    }

    fn set_item(&self, name: &str, value: &str) -> Result<()> {
        let _guard = self.guard()?;
        self.write_slot(name, value)
    }

    fn remove_item(&self, name: &str) -> Result<()> {
        let _guard = self.guard()?;
        match fs::remove_file(self.slot_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn slot_names(&self) -> Result<Vec<String>> {
        let _guard = self.guard()?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SLOT_EXTENSION) {
                continue;
            }
            // Files that do not decode to a name were not written by us.
            let decoded = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| hex::decode(stem).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok());
            names.extend(decoded);
        }
        names.sort();
        Ok(names)
    }

    fn update_item(&self, name: &str, update: SlotUpdate<'_>) -> Result<()> {
        let _guard = self.guard()?;
        let current = self.read_slot(name)?;
        if let Some(next) = update(current.as_deref())? {
            self.write_slot(name, &next)?;
        }
        Ok(())
    }
}
