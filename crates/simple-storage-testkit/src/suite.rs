//! Behavioural checks shared by every backend.
//!
//! Each check takes a storage, starts from a cleared collection and panics
//! with a message naming the check if the backend misbehaves. [`run_all`]
//! runs them in sequence.

use std::sync::Arc;

use rand::Rng;
use simple_storage_core::{Key, Record, SchemaVersion, ValidationError};
use simple_storage_store::{Storage, StorageExt, StoreError};

use crate::fixtures::{self, DATE_SURVIVORS};

/// Number of random records written by the checks that need several.
pub const BATCH: usize = 5;

async fn reset<S: Storage + ?Sized>(storage: &S) {
    storage.clear().await.expect("clear before check");
}

/// `set` twice with the same key keeps one record holding the second value.
pub async fn upsert_replaces<S: Storage + ?Sized>(storage: &S) {
    reset(storage).await;

    let first = Record::new().with("id", 1).with("name", "first");
    let second = Record::new().with("id", 1).with("name", "second");
    storage.set(first).await.expect("set first");
    storage.set(second.clone()).await.expect("set second");

    assert_eq!(storage.count().await.expect("count"), 1, "upsert_replaces");
    assert_eq!(
        storage.get(&Key::from(1)).await.expect("get"),
        Some(second),
        "upsert_replaces"
    );
}

/// A record without its key field is rejected and nothing is written.
pub async fn set_requires_key<S: Storage + ?Sized>(storage: &S) {
    reset(storage).await;

    let err = storage
        .set(Record::new().with("test", 0))
        .await
        .expect_err("record without key must be rejected");
    assert!(
        matches!(err, StoreError::Validation(ValidationError::MissingKey(_))),
        "set_requires_key: unexpected error {:?}",
        err
    );
    assert_eq!(storage.count().await.expect("count"), 0, "set_requires_key");
}

/// Random records are all counted and each can be read back by key.
pub async fn set_get_count<S: Storage + ?Sized>(storage: &S, rng: &mut impl Rng) {
    reset(storage).await;

    let records = fixtures::random_records(rng, BATCH);
    for record in &records {
        storage.set(record.clone()).await.expect("set");
    }

    assert_eq!(storage.count().await.expect("count"), BATCH, "set_get_count");
    for record in &records {
        let found = storage
            .get(&fixtures::key_of(record))
            .await
            .expect("get")
            .unwrap_or_else(|| panic!("set_get_count: {:?} missing", record));
        assert_eq!(found.get("id"), record.get("id"), "set_get_count");
        assert_eq!(found.get("name"), record.get("name"), "set_get_count");
    }
    assert_eq!(
        storage.get(&Key::from("no such key")).await.expect("get"),
        None,
        "set_get_count"
    );
}

/// Integer and text keys with the same digits are different keys.
pub async fn keys_are_typed<S: Storage + ?Sized>(storage: &S) {
    reset(storage).await;

    storage
        .set(Record::new().with("id", 42).with("kind", "integer"))
        .await
        .expect("set integer");
    storage
        .set(Record::new().with("id", "42").with("kind", "text"))
        .await
        .expect("set text");

    assert_eq!(storage.count().await.expect("count"), 2, "keys_are_typed");
    let text = storage.get(&Key::from("42")).await.expect("get");
    assert_eq!(
        text.as_ref().and_then(|r| r.str_field("kind")),
        Some("text"),
        "keys_are_typed"
    );
}

/// Deleting by key removes that record; deleting a missing key changes
/// nothing and succeeds.
pub async fn delete_by_key<S: Storage + ?Sized>(storage: &S, rng: &mut impl Rng) {
    reset(storage).await;

    let records = fixtures::random_records(rng, BATCH);
    for record in &records {
        storage.set(record.clone()).await.expect("set");
    }

    let victim = fixtures::key_of(&records[rng.gen_range(0..records.len())]);
    storage.delete_key(victim.clone()).await.expect("delete");
    assert_eq!(storage.get(&victim).await.expect("get"), None, "delete_by_key");
    assert_eq!(
        storage.count().await.expect("count"),
        BATCH - 1,
        "delete_by_key"
    );

    storage.delete_key(victim).await.expect("delete again");
    storage
        .delete_key("missing")
        .await
        .expect("delete missing");
    assert_eq!(
        storage.count().await.expect("count"),
        BATCH - 1,
        "delete_by_key"
    );
}

/// A predicate delete removes exactly the matching records.
pub async fn delete_by_predicate<S: Storage + ?Sized>(storage: &S) {
    reset(storage).await;

    for record in fixtures::date_records() {
        storage.set(record).await.expect("set");
    }
    storage
        .delete_where(fixtures::day_digit_predicate)
        .await
        .expect("delete_where");

    assert_eq!(
        storage.count().await.expect("count"),
        DATE_SURVIVORS,
        "delete_by_predicate"
    );
    assert_eq!(
        storage.get(&Key::from("2004-12-30")).await.expect("get"),
        None,
        "delete_by_predicate"
    );

    // Matching nothing is not an error.
    storage
        .delete_where(|_| false)
        .await
        .expect("delete_where nothing");
    assert_eq!(
        storage.count().await.expect("count"),
        DATE_SURVIVORS,
        "delete_by_predicate"
    );
}

/// `clear` empties the collection and leaves it usable.
pub async fn clear_resets<S: Storage + ?Sized>(storage: &S, rng: &mut impl Rng) {
    reset(storage).await;

    for record in fixtures::random_records(rng, BATCH) {
        storage.set(record).await.expect("set");
    }
    storage.clear().await.expect("clear");
    assert_eq!(storage.count().await.expect("count"), 0, "clear_resets");

    storage
        .set(Record::new().with("id", 1))
        .await
        .expect("set after clear");
    assert_eq!(storage.count().await.expect("count"), 1, "clear_resets");
}

/// Records written under one version are not visible under another, and
/// invalid versions leave the current one in place.
pub async fn version_isolation<S: Storage + ?Sized>(storage: &S, rng: &mut impl Rng) {
    reset(storage).await;
    let start = storage.version();

    let record = fixtures::random_record(rng);
    let key = fixtures::key_of(&record);
    storage.set(record).await.expect("set");

    let next = SchemaVersion::new(start.get() + 1).expect("next version");
    storage.set_version(next);
    assert_eq!(storage.version(), next, "version_isolation");
    assert_eq!(storage.get(&key).await.expect("get"), None, "version_isolation");
    assert_eq!(storage.count().await.expect("count"), 0, "version_isolation");

    assert!(storage.try_set_version(0i64).is_err(), "version_isolation");
    assert!(storage.try_set_version(f64::NAN).is_err(), "version_isolation");
    assert!(storage.try_set_version(1.5f64).is_err(), "version_isolation");
    assert_eq!(storage.version(), next, "version_isolation");

    storage.set_version(start);
}

/// Concurrent writes with distinct keys all land.
pub async fn concurrent_sets(storage: Arc<dyn Storage>, writers: usize) {
    storage.clear().await.expect("clear before check");

    let mut tasks = tokio::task::JoinSet::new();
    for id in 0..writers {
        let storage = storage.clone();
        tasks.spawn(async move {
            storage
                .set(Record::new().with("id", id as i64).with("writer", true))
                .await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("writer task").expect("concurrent set");
    }

    assert_eq!(
        storage.count().await.expect("count"),
        writers,
        "concurrent_sets"
    );
}

/// Run every sequential check against `storage`.
pub async fn run_all<S: Storage + ?Sized>(storage: &S, rng: &mut impl Rng) {
    upsert_replaces(storage).await;
    set_requires_key(storage).await;
    set_get_count(storage, rng).await;
    keys_are_typed(storage).await;
    delete_by_key(storage, rng).await;
    delete_by_predicate(storage).await;
    clear_resets(storage, rng).await;
    version_isolation(storage, rng).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use simple_storage_store::{MemorySlots, SlotStorage, SqliteStorage};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_suite_on_memory_slots() {
        let storage = SlotStorage::new(MemorySlots::new(), "MyCache", "Users").unwrap();
        run_all(&storage, &mut StdRng::seed_from_u64(1)).await;
    }

    #[tokio::test]
    async fn test_suite_on_sqlite() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(dir.path(), "MyCache", "Users").unwrap();
        run_all(&storage, &mut StdRng::seed_from_u64(2)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sets_on_both() {
        let dir = TempDir::new().unwrap();
        let sqlite: Arc<dyn Storage> =
            Arc::new(SqliteStorage::new(dir.path(), "MyCache", "Users").unwrap());
        let slots: Arc<dyn Storage> =
            Arc::new(SlotStorage::new(MemorySlots::new(), "MyCache", "Users").unwrap());

        concurrent_sets(sqlite, 16).await;
        concurrent_sets(slots, 16).await;
    }
}
