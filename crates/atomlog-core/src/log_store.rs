//! The LogStore trait — what the transactional log protocol talks to.

use crate::Result;

/// Storage capability used by the transactional log protocol to persist
/// and read back log records.
///
/// Implementations differ in how they obtain mutual exclusion on record
/// creation. Whatever the mechanism, for a given key at most one concurrent
/// `write(.., overwrite = false)` may succeed; all others must fail with
/// [`LogStoreError::AlreadyExists`](crate::LogStoreError::AlreadyExists).
pub trait LogStore: Send + Sync {
    /// Read the record at `key` as lines.
    fn read(&self, key: &str) -> Result<Vec<String>>;

    /// List keys in the same directory as `key` whose file name sorts at or
    /// after `key`'s, in ascending order.
    fn list_from(&self, key: &str) -> Result<Vec<String>>;

    /// Write `actions` to `key`, one per line, each terminated by `\n`.
    ///
    /// Returns the number of bytes written.
    fn write(
        &self,
        key: &str,
        actions: &mut dyn Iterator<Item = String>,
        overwrite: bool,
    ) -> Result<u64>;

    /// Drop any cached listing or content state.
    fn invalidate_cache(&self);

    /// Whether a concurrent reader could observe a partially written record.
    fn is_partial_write_visible(&self, key: &str) -> bool;
}
