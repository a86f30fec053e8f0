//! Slot-store implementation of the Storage trait.
//!
//! The fallback keeps a whole collection as one JSON array in a single slot
//! named `<database>_<collection>_v<version>`. Every operation reads the
//! slot, works on the array in memory and writes it back if it changed.
//!
//! Changing the version only points the facade at a different slot. Slots
//! of other versions are left in place, so going back to an earlier version
//! sees its records again.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use simple_storage_core::{
    validate_name, validate_record, DeleteSelector, Key, KeyPath, Record, SchemaVersion,
    VersionCell,
};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::slots::{MemorySlots, SlotStore};
use crate::traits::Storage;

const EMPTY_SLOT: &str = "[]";

/// Storage for one collection kept in a [`SlotStore`].
pub struct SlotStorage<S = MemorySlots> {
    slots: S,
    database: String,
    collection: String,
    key_path: KeyPath,
    version: VersionCell,
    slot_name: Mutex<(SchemaVersion, String)>,
}

impl<S: SlotStore> SlotStorage<S> {
    /// Storage for `collection` in `database`, kept in `slots`.
    ///
    /// Uses key path `id` and version 1. Performs no I/O.
    pub fn new(
        slots: S,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self> {
        let database = database.into();
        let collection = collection.into();
        validate_name("database", &database)?;
        validate_name("collection", &collection)?;

        let version = SchemaVersion::INITIAL;
        let name = format_slot_name(&database, &collection, version);
        Ok(Self {
            slots,
            database,
            collection,
            key_path: KeyPath::default(),
            version: VersionCell::new(version),
            slot_name: Mutex::new((version, name)),
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

    pub fn slots(&self) -> &S {
        &self.slots
    }

    /// Name of the slot the current version addresses.
    ///
    /// Cached, and recomputed only after the version changes.
    pub fn slot_name(&self) -> String {
        let version = self.version.get();
        let mut cached = self
            .slot_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if cached.0 != version {
            *cached = (
                version,
                format_slot_name(&self.database, &self.collection, version),
            );
        }
        cached.1.clone()
    }

    /// Run `edit` over the records of the current slot.
    ///
    /// A missing slot starts out empty and is written as `[]`. When `edit`
    /// returns `true` the slot is rewritten, otherwise it is left as is.
    fn modify(&self, edit: &mut dyn FnMut(&mut Vec<Record>) -> Result<bool>) -> Result<()> {
        let name = self.slot_name();
        self.slots.update_item(&name, &mut |current| {
            let mut records = match current {
                Some(value) => decode_slot(&name, value)?,
                None => Vec::new(),
            };

            if edit(&mut records)? {
                debug!(slot = %name, records = records.len(), "slot rewritten");
                return encode_slot(&records).map(Some);
            }
            Ok(current.is_none().then(|| EMPTY_SLOT.to_string()))
        })
    }

    fn position(&self, records: &[Record], key: &Key) -> Option<usize> {
        records
            .iter()
            .position(|record| self.key_path.matches(record, key))
    }
}

fn format_slot_name(database: &str, collection: &str, version: SchemaVersion) -> String {
    format!("{}_{}_v{}", database, collection, version)
}

fn decode_slot(name: &str, value: &str) -> Result<Vec<Record>> {
    serde_json::from_str(value).map_err(|e| {
        warn!(slot = %name, error = %e, "slot does not hold a record array");
        StoreError::Serialization(format!("slot {}: {}", name, e))
    })
}

fn encode_slot(records: &[Record]) -> Result<String> {
    serde_json::to_string(records).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl<S: SlotStore> Storage for SlotStorage<S> {
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
        self.modify(&mut |records| {
            match self.position(records, &key) {
                Some(index) => records[index] = record.clone(),
                None => records.push(record.clone()),
            }
            Ok(true)
        })
    }

    async fn get(&self, key: &Key) -> Result<Option<Record>> {
        let mut found = None;
        self.modify(&mut |records| {
            found = self
                .position(records, key)
                .map(|index| records[index].clone());
            Ok(false)
        })?;
        Ok(found)
    }

    async fn count(&self) -> Result<usize> {
        let mut count = 0;
        self.modify(&mut |records| {
            count = records.len();
            Ok(false)
        })?;
        Ok(count)
    }

    async fn delete(&self, selector: DeleteSelector) -> Result<()> {
        match selector {
            DeleteSelector::Key(key) => self.modify(&mut |records| {
                match self.position(records, &key) {
                    Some(index) => {
                        records.remove(index);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }),
            DeleteSelector::Predicate(predicate) => self.modify(&mut |records| {
                let before = records.len();
                records.retain(|record| !predicate(record));
                Ok(records.len() != before)
            }),
        }
    }

    async fn clear(&self) -> Result<()> {
        let name = self.slot_name();
        debug!(slot = %name, "clear");
        self.slots.set_item(&name, EMPTY_SLOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::FileSlots;
    use crate::traits::StorageExt;
    use simple_storage_core::ValidationError;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn storage() -> SlotStorage {
        SlotStorage::new(MemorySlots::new(), "MyCache", "Users").unwrap()
    }

    fn user(id: i64, name: &str) -> Record {
        Record::new().with("id", id).with("name", name)
    }

    #[test]
    fn test_slot_name_follows_version() {
        let store = storage();
        assert_eq!(store.slot_name(), "MyCache_Users_v1");

        store.set_version(SchemaVersion::new(7).unwrap());
        assert_eq!(store.slot_name(), "MyCache_Users_v7");
        assert_eq!(store.slot_name(), "MyCache_Users_v7");
    }

    #[tokio::test]
    async fn test_first_read_initializes_slot() {
        let store = storage();
        assert_eq!(store.slots().get_item("MyCache_Users_v1").unwrap(), None);

        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(
            store.slots().get_item("MyCache_Users_v1").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_set_get_upsert() {
        let store = storage();

        store.set(user(1, "Boris")).await.unwrap();
        store.set(user(2, "Gleb")).await.unwrap();
        store.set(user(1, "Vladimir")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let found = store.get(&Key::from(1)).await.unwrap().unwrap();
        assert_eq!(found.str_field("name"), Some("Vladimir"));
        assert!(store.get(&Key::from(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_requires_key() {
        let store = storage();
        let err = store.set(Record::new().with("name", "x")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingKey(_))
        ));
        assert_eq!(store.slots().get_item("MyCache_Users_v1").unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_miss_does_not_rewrite() {
        let store = storage();
        let raw = r#"[ {"id": 1, "name": "Ivan"} ]"#;
        store.slots().set_item("MyCache_Users_v1", raw).unwrap();

        store.delete_key(2).await.unwrap();
        store.delete_where(|_| false).await.unwrap();
        assert_eq!(
            store.slots().get_item("MyCache_Users_v1").unwrap().as_deref(),
            Some(raw)
        );

        store.delete_key(1).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_where_date_fixture() {
        let store = storage();
        for day in [
            "2004-12-30",
            "2004-12-31",
            "2005-01-01",
            "2005-01-02",
            "2005-01-03",
            "2005-01-04",
        ] {
            store.set(Record::new().with("id", day)).await.unwrap();
        }

        store
            .delete_where(|r| r.str_field("id").and_then(|id| id.chars().nth(3)) < Some('5'))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_earlier_version_keeps_its_records() {
        let store = storage();
        store.set(user(1, "Ivan")).await.unwrap();

        store.set_version(SchemaVersion::new(2).unwrap());
        assert_eq!(store.count().await.unwrap(), 0);

        store.set_version(SchemaVersion::INITIAL);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = storage();
        store.set(user(1, "Ivan")).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(
            store.slots().get_item("MyCache_Users_v1").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_unparseable_slot_is_an_error() {
        let store = storage();
        store
            .slots()
            .set_item("MyCache_Users_v1", "{not json")
            .unwrap();

        assert!(matches!(
            store.count().await,
            Err(StoreError::Serialization(_))
        ));
        assert!(matches!(
            store.set(user(1, "Ivan")).await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_file_slots_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store =
                SlotStorage::new(FileSlots::open(dir.path()).unwrap(), "MyCache", "Users").unwrap();
            store.set(user(1, "Ivan")).await.unwrap();
        }

        let store =
            SlotStorage::new(FileSlots::open(dir.path()).unwrap(), "MyCache", "Users").unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sets() {
        let store = Arc::new(storage());

        let mut tasks = tokio::task::JoinSet::new();
        for id in 0..32 {
            let store = store.clone();
            tasks.spawn(async move { store.set(user(id, "concurrent")).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 32);
    }
}
