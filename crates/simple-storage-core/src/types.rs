//! Record, key and key path types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// A primary key: the scalar value of a record's key field.
///
/// Integer and text keys never compare equal, so `1` and `"1"` address
/// different records. Ordering puts every integer before every string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Integer(i64),
    Text(String),
}

impl Key {
    /// Interpret a JSON value as a key.
    ///
    /// Floats are accepted only when they hold an exact integer.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Key::Text(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(Key::Integer(i));
                }
                let f = n.as_f64()?;
                if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
                {
                    Some(Key::Integer(f as i64))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Convert back to a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Integer(i) => Value::from(*i),
            Key::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(i) => write!(f, "Key({})", i),
            Key::Text(s) => write!(f, "Key({:?})", s),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(i) => write!(f, "{}", i),
            Key::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Integer(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Integer(value.into())
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Integer(value.into())
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

/// Name of the record field that holds the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPath(String);

impl KeyPath {
    pub const DEFAULT: &'static str = "id";

    pub fn new(field: impl Into<String>) -> Self {
        Self(field.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the key from a record.
    pub fn extract(&self, record: &Record) -> Result<Key, ValidationError> {
        let value = record
            .get(&self.0)
            .ok_or_else(|| ValidationError::MissingKey(self.0.clone()))?;

        Key::from_value(value).ok_or_else(|| ValidationError::InvalidKey {
            field: self.0.clone(),
            found: value.to_string(),
        })
    }

    /// Whether the record's key field holds `key`.
    ///
    /// Records without a usable key never match.
    pub fn matches(&self, record: &Record, key: &Key) -> bool {
        record
            .get(&self.0)
            .and_then(Key::from_value)
            .is_some_and(|k| &k == key)
    }
}

impl Default for KeyPath {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for KeyPath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A stored record: a mapping of field name to JSON value.
///
/// The only structural requirement is the primary key field, checked when
/// the record is written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field value as a string slice, if it is a string.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ValidationError::NotAnObject(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_from_value() {
        assert_eq!(Key::from_value(&json!(82)), Some(Key::Integer(82)));
        assert_eq!(Key::from_value(&json!("82")), Some(Key::from("82")));
        assert_eq!(Key::from_value(&json!(4.0)), Some(Key::Integer(4)));
        assert_eq!(Key::from_value(&json!(4.5)), None);
        assert_eq!(Key::from_value(&json!(null)), None);
        assert_eq!(Key::from_value(&json!(true)), None);
        assert_eq!(Key::from_value(&json!([1])), None);
    }

    #[test]
    fn test_integer_and_text_keys_differ() {
        assert_ne!(Key::from(1), Key::from("1"));
        assert!(Key::from(i64::MAX) < Key::from(""));
    }

    #[test]
    fn test_key_path_extract() {
        let path = KeyPath::default();
        let record = Record::new().with("id", 82).with("name", "Alexander");
        assert_eq!(path.extract(&record).unwrap(), Key::Integer(82));

        let missing = Record::new().with("test", 0);
        assert_eq!(
            path.extract(&missing),
            Err(ValidationError::MissingKey("id".into()))
        );

        let bad = Record::new().with("id", json!({"nested": true}));
        assert!(matches!(
            path.extract(&bad),
            Err(ValidationError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_key_path_matches() {
        let path = KeyPath::new("uid");
        let record = Record::new().with("uid", "2005-01-01");
        assert!(path.matches(&record, &Key::from("2005-01-01")));
        assert!(!path.matches(&record, &Key::from("2005-01-02")));
        assert!(!KeyPath::default().matches(&record, &Key::from("2005-01-01")));
    }

    #[test]
    fn test_record_try_from_value() {
        let record = Record::try_from(json!({"id": 1, "url": "example.org"})).unwrap();
        assert_eq!(record.str_field("url"), Some("example.org"));
        assert_eq!(record.len(), 2);

        assert!(matches!(
            Record::try_from(json!([1, 2])),
            Err(ValidationError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_record_serializes_as_plain_object() {
        let record = Record::new().with("id", 7);
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"id":7}"#);
    }
}
