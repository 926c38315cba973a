//! In-process object store client.
//!
//! [`MemoryStore`] keeps objects in a shared map. Streams buffer privately
//! and publish under the map lock on close, so create-only checks and
//! publication happen atomically with respect to other writers.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tracing::{debug, instrument};

use atomlog_core::{ObjectStoreClient, PreconditionFailed, WriteStream};

type Objects = Arc<Mutex<BTreeMap<String, Bytes>>>;

/// An [`ObjectStoreClient`] held entirely in memory.
///
/// Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Objects,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> io::Result<usize> {
        Ok(lock(&self.objects)?.len())
    }

    /// Returns `true` if no objects are stored.
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(lock(&self.objects)?.is_empty())
    }
}

fn lock(objects: &Objects) -> io::Result<MutexGuard<'_, BTreeMap<String, Bytes>>> {
    objects
        .lock()
        .map_err(|_| io::Error::other("memory store lock poisoned"))
}

impl ObjectStoreClient for MemoryStore {
    fn exists(&self, key: &str) -> io::Result<bool> {
        Ok(lock(&self.objects)?.contains_key(key))
    }

    fn create(&self, key: &str, overwrite: bool) -> io::Result<Box<dyn WriteStream>> {
        Ok(Box::new(MemoryWriteStream {
            objects: Arc::clone(&self.objects),
            key: key.to_string(),
            overwrite,
            buf: Vec::new(),
        }))
    }

    fn get(&self, key: &str) -> io::Result<Bytes> {
        lock(&self.objects)?.get(key).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no object at {key}"))
        })
    }

    fn list(&self, prefix: &str) -> io::Result<Vec<String>> {
        Ok(lock(&self.objects)?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

struct MemoryWriteStream {
    objects: Objects,
    key: String,
    overwrite: bool,
    buf: Vec<u8>,
}

impl WriteStream for MemoryWriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    #[instrument(skip(self), fields(key = %self.key, size = self.buf.len()))]
    fn close(self: Box<Self>) -> io::Result<()> {
        let MemoryWriteStream {
            objects,
            key,
            overwrite,
            buf,
        } = *self;
        let mut guard = lock(&objects)?;
        if !overwrite && guard.contains_key(&key) {
            return Err(PreconditionFailed::new(key).into_io());
        }
        debug!("Published {} bytes to {}", buf.len(), key);
        guard.insert(key, Bytes::from(buf));
        Ok(())
    }
}
