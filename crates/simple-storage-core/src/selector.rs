//! Delete selectors: a single key or a predicate over records.

use std::fmt;
use std::sync::Arc;

use crate::types::{Key, Record};

/// A caller-supplied filter, evaluated once per record during a delete.
pub type Predicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// What a `delete` call removes.
///
/// Resolved once at the start of the call; backends match on it rather than
/// inspecting the argument repeatedly.
#[derive(Clone)]
pub enum DeleteSelector {
    /// Remove the record with this key, if any.
    Key(Key),
    /// Remove every record for which the predicate returns `true`.
    Predicate(Predicate),
}

impl DeleteSelector {
    pub fn key(key: impl Into<Key>) -> Self {
        DeleteSelector::Key(key.into())
    }

    pub fn matching<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        DeleteSelector::Predicate(Arc::new(predicate))
    }
}

impl fmt::Debug for DeleteSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteSelector::Key(key) => f.debug_tuple("Key").field(key).finish(),
            DeleteSelector::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<Key> for DeleteSelector {
    fn from(key: Key) -> Self {
        DeleteSelector::Key(key)
    }
}

impl From<i64> for DeleteSelector {
    fn from(key: i64) -> Self {
        DeleteSelector::Key(key.into())
    }
}

impl From<&str> for DeleteSelector {
    fn from(key: &str) -> Self {
        DeleteSelector::Key(key.into())
    }
}

impl From<String> for DeleteSelector {
    fn from(key: String) -> Self {
        DeleteSelector::Key(key.into())
    }
}

impl From<Predicate> for DeleteSelector {
    fn from(predicate: Predicate) -> Self {
        DeleteSelector::Predicate(predicate)
    }
}
