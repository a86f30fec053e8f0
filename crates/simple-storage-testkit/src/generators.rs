//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::Value;

use simple_storage_core::{Key, Record, SchemaVersion};

/// Generate an integer key.
pub fn integer_key() -> impl Strategy<Value = Key> {
    any::<i64>().prop_map(Key::Integer)
}

/// Generate a text key.
pub fn text_key() -> impl Strategy<Value = Key> {
    "[a-zA-Z0-9_-]{1,24}".prop_map(Key::Text)
}

/// Generate a key of either kind.
pub fn key() -> impl Strategy<Value = Key> {
    prop_oneof![integer_key(), text_key()]
}

/// Generate a schema version.
pub fn version() -> impl Strategy<Value = SchemaVersion> {
    (1u32..=1_000).prop_filter_map("positive", |v| SchemaVersion::new(v).ok())
}

/// Generate a scalar field value.
pub fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,32}".prop_map(Value::from),
    ]
}

/// Generate a record whose `id` field holds `key`.
pub fn record_with_key(key: Key) -> impl Strategy<Value = Record> {
    prop::collection::btree_map("[a-z]{1,8}", field_value(), 0..6).prop_map(move |fields| {
        let mut record = Record::new();
        for (field, value) in fields {
            record.insert(field, value);
        }
        record.insert("id", key.to_value());
        record
    })
}

/// Generate a record with a random key.
pub fn record() -> impl Strategy<Value = Record> {
    key().prop_flat_map(record_with_key)
}

/// Generate records with distinct keys.
pub fn records(max: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::btree_set(key(), 0..=max).prop_flat_map(|keys| {
        keys.into_iter()
            .map(record_with_key)
            .collect::<Vec<_>>()
    })
}
