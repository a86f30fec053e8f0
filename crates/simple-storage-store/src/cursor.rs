//! Cursor over a collection and the filter deleter built on it.

use simple_storage_core::{Key, Record};
use tracing::trace;

use crate::error::Result;
use crate::scope::CollectionHandle;

/// Walks a collection in ascending key order.
///
/// The cursor remembers the last key it produced and seeks past it on each
/// step, so deleting the current record does not disturb iteration.
pub struct Cursor<'h, 'a> {
    handle: &'h CollectionHandle<'a>,
    position: Option<Key>,
    exhausted: bool,
}

impl<'h, 'a> Cursor<'h, 'a> {
    pub(crate) fn new(handle: &'h CollectionHandle<'a>) -> Self {
        Self {
            handle,
            position: None,
            exhausted: false,
        }
    }

    /// Step to the next record. `None` once the collection is exhausted.
    pub fn advance(&mut self) -> Result<Option<Record>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.handle.next_after(self.position.as_ref())? {
            Some((key, record)) => {
                self.position = Some(key);
                Ok(Some(record))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Key of the record last returned by [`advance`](Self::advance).
    pub fn key(&self) -> Option<&Key> {
        self.position.as_ref()
    }

    /// Delete the record under the cursor.
    pub fn delete(&self) -> Result<bool> {
        match &self.position {
            Some(key) => self.handle.delete(key),
            None => Ok(false),
        }
    }
}

/// Delete every record for which `predicate` holds. Returns how many went.
///
/// The first error stops the walk; the surrounding transaction then rolls
/// back, so a failed run deletes nothing.
pub fn delete_where<P>(handle: &CollectionHandle<'_>, predicate: P) -> Result<usize>
where
    P: Fn(&Record) -> bool,
{
    handle.ensure_writable()?;

    let mut cursor = handle.cursor();
    let mut deleted = 0;
    while let Some(record) = cursor.advance()? {
        if predicate(&record) && cursor.delete()? {
            deleted += 1;
        }
    }

    trace!(collection = handle.collection(), deleted, "filter delete finished");
    Ok(deleted)
}
