//! The ObjectStoreClient trait — the storage seam consumed by log stores.
//!
//! Log stores never touch the filesystem or object storage directly. They go
//! through this trait, whose implementations live in `atomlog-storage`.
//! Calls are blocking; a client may block on network I/O and has no timeout
//! of its own.

use std::io;

use bytes::Bytes;

/// Primitive object store operations required by a conditional log store.
///
/// # Atomic Creates
///
/// [`create`](ObjectStoreClient::create) must publish atomically: until the
/// returned stream is closed successfully, no reader may observe the
/// object (or a partial version of it) under `key`. With
/// `overwrite == false` the client must enforce a create-only precondition
/// in the store itself and report a lost race as an error whose cause chain
/// carries the store's precondition marker (see
/// [`PreconditionFailed`](crate::PreconditionFailed)).
///
/// Existence checks must observe completed writes immediately.
pub trait ObjectStoreClient: Send + Sync {
    /// Check if an object exists at the given key.
    fn exists(&self, key: &str) -> io::Result<bool>;

    /// Open a stream that atomically creates (or, with `overwrite`,
    /// replaces) the object at `key` when closed.
    fn create(&self, key: &str, overwrite: bool) -> io::Result<Box<dyn WriteStream>>;

    /// Read an object. Fails with [`io::ErrorKind::NotFound`] if absent.
    fn get(&self, key: &str) -> io::Result<Bytes>;

    /// List all object keys matching the given prefix, sorted.
    fn list(&self, prefix: &str) -> io::Result<Vec<String>>;
}

/// A pending atomic write opened by [`ObjectStoreClient::create`].
///
/// Dropping a stream without closing it abandons the write.
pub trait WriteStream: Send {
    /// Append bytes to the pending object.
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Publish the object durably.
    fn close(self: Box<Self>) -> io::Result<()>;
}
