//! Validation applied before a record or a name reaches a backend.

use crate::error::ValidationError;
use crate::types::{Key, KeyPath, Record};

/// Validate a record for writing and return its key.
///
/// The record must hold the key field, and the field must be an integer or
/// a string. Nothing else about the record's shape is checked.
pub fn validate_record(record: &Record, key_path: &KeyPath) -> Result<Key, ValidationError> {
    key_path.extract(record)
}

/// Validate a database or collection name.
///
/// Names become file names and table names, so they must be non-empty and
/// free of path separators and NUL bytes. `.` and `..` are rejected.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), ValidationError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(ValidationError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_record_requires_key() {
        let path = KeyPath::default();
        assert!(validate_record(&Record::new().with("id", 1), &path).is_ok());
        assert_eq!(
            validate_record(&Record::new().with("test", 0), &path),
            Err(ValidationError::MissingKey("id".into()))
        );
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("database", "MyCache").is_ok());
        assert!(validate_name("collection", "Users v2").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b", "a\0b"] {
            assert!(validate_name("database", bad).is_err(), "{:?}", bad);
        }
    }

    proptest! {
        #[test]
        fn test_integer_keys_roundtrip(id in any::<i64>()) {
            let record = Record::new().with("id", id);
            prop_assert_eq!(validate_record(&record, &KeyPath::default()), Ok(Key::Integer(id)));
        }

        #[test]
        fn test_string_keys_roundtrip(id in ".*") {
            let record = Record::new().with("id", id.clone());
            prop_assert_eq!(validate_record(&record, &KeyPath::default()), Ok(Key::Text(id)));
        }
    }
}
