//! Backend parity: every backend passes the same behavioural suite.
//!
//! The one intended difference, what happens to old records when the
//! version moves back, is checked explicitly at the end.

use std::sync::Arc;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use simple_storage::store::{FileSlots, MemorySlots, SlotStorage, SqliteStorage};
use simple_storage::{
    open_backend, BackendConfig, BackendKind, Key, Record, SchemaVersion, Storage, StorageConfig,
    StorageExt,
};
use simple_storage_testkit::{generators, suite};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn backends(dir: &TempDir) -> Vec<(&'static str, Box<dyn Storage>)> {
    vec![
        (
            "sqlite",
            Box::new(SqliteStorage::new(dir.path().join("db"), "MyCache", "Users").unwrap()),
        ),
        (
            "memory_slots",
            Box::new(SlotStorage::new(MemorySlots::new(), "MyCache", "Users").unwrap()),
        ),
        (
            "file_slots",
            Box::new(
                SlotStorage::new(
                    FileSlots::open(dir.path().join("slots")).unwrap(),
                    "MyCache",
                    "Users",
                )
                .unwrap(),
            ),
        ),
    ]
}

#[tokio::test]
async fn test_suite_on_every_backend() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    for (seed, (name, storage)) in backends(&dir).into_iter().enumerate() {
        tracing::info!(backend = name, "running suite");
        suite::run_all(storage.as_ref(), &mut StdRng::seed_from_u64(seed as u64)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sets_on_every_backend() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    for (_, storage) in backends(&dir) {
        suite::concurrent_sets(Arc::from(storage), 24).await;
    }
}

#[tokio::test]
async fn test_configured_backends_pass_the_suite() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let configs = [
        (
            BackendConfig::sqlite(dir.path().join("configured")),
            BackendKind::Sqlite,
        ),
        (
            BackendConfig::file_slots(dir.path().join("configured-slots")),
            BackendKind::FileSlots,
        ),
        (BackendConfig::MemorySlots, BackendKind::MemorySlots),
    ];

    for (backend, expected) in configs {
        let config = StorageConfig::new("ConfiguredCache", "Users").with_backend(backend);
        let (kind, storage) = open_backend(&config).unwrap();
        assert_eq!(kind, expected);
        suite::run_all(storage.as_ref(), &mut StdRng::seed_from_u64(9)).await;
    }
}

/// SQLite recreates the collection on any version change, so going back to
/// an earlier version finds it empty. The slot fallback only switches slots,
/// so the earlier version's records are still there.
#[tokio::test]
async fn test_version_rollback_differs_between_backends() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    for (name, storage) in backends(&dir) {
        storage.clear().await.unwrap();
        storage
            .set(Record::new().with("id", 1).with("name", "Фома"))
            .await
            .unwrap();

        storage.set_version(SchemaVersion::new(2).unwrap());
        assert_eq!(storage.count().await.unwrap(), 0, "{}", name);

        storage.set_version(SchemaVersion::INITIAL);
        let expected = if name == "sqlite" { 0 } else { 1 };
        assert_eq!(storage.count().await.unwrap(), expected, "{}", name);
    }
}

#[tokio::test]
async fn test_instances_on_one_database_see_each_other() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("shared");

    let writer = SqliteStorage::new(&root, "MyCache", "Users").unwrap();
    let reader = SqliteStorage::new(&root, "MyCache", "Users").unwrap();

    writer
        .set(Record::new().with("id", "2005-01-01"))
        .await
        .unwrap();
    assert!(reader
        .get(&Key::from("2005-01-01"))
        .await
        .unwrap()
        .is_some());

    reader.delete_key("2005-01-01").await.unwrap();
    assert_eq!(writer.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_collection_names_are_case_sensitive_on_every_backend() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let backends = [
        BackendConfig::sqlite(dir.path().join("cased")),
        BackendConfig::file_slots(dir.path().join("cased-slots")),
        BackendConfig::MemorySlots,
    ];

    for backend in backends {
        let upper = StorageConfig::new("CasedCache", "Users").with_backend(backend.clone());
        let lower = StorageConfig::new("CasedCache", "users").with_backend(backend);
        let (_, upper) = open_backend(&upper).unwrap();
        let (_, lower) = open_backend(&lower).unwrap();
        upper.clear().await.unwrap();
        lower.clear().await.unwrap();

        upper.set(Record::new().with("id", 1)).await.unwrap();
        upper.set(Record::new().with("id", 2)).await.unwrap();
        lower.set(Record::new().with("id", 9)).await.unwrap();

        assert_eq!(upper.count().await.unwrap(), 2);
        assert_eq!(lower.count().await.unwrap(), 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn test_backends_agree_on_predicate_deletes(records in generators::records(12)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = TempDir::new().unwrap();

        let counts: Vec<usize> = runtime.block_on(async {
            let mut counts = Vec::new();
            for (_, storage) in backends(&dir) {
                storage.clear().await.unwrap();
                for record in &records {
                    storage.set(record.clone()).await.unwrap();
                }
                storage
                    .delete_where(|r| r.get("id").map_or(false, |v| v.is_i64()))
                    .await
                    .unwrap();
                counts.push(storage.count().await.unwrap());
            }
            counts
        });

        let texts = records.iter().filter(|r| r.get("id").map_or(false, |v| v.is_string())).count();
        prop_assert!(counts.iter().all(|c| *c == texts), "counts {:?}, expected {}", counts, texts);
    }
}
