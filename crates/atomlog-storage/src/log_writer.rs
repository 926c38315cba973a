//! Conditional log writes on top of an atomic object store client.
//!
//! The store's own create-only precondition is what keeps two writers from
//! both committing the same log version. This module's job is to translate
//! how the store reports a lost race (a marker string somewhere in an
//! error's cause chain) into [`LogStoreError::AlreadyExists`], and to keep
//! every other failure distinguishable from it.

use std::io;
use std::sync::Arc;

use tracing::{debug, error, instrument};

use atomlog_core::precondition::is_precondition_failure;
use atomlog_core::{LogStore, LogStoreConfig, LogStoreError, ObjectStoreClient, Result};

/// A [`LogStore`] that relies on the backing store's atomic create-only
/// writes for mutual exclusion.
///
/// Holds no mutable state and no locks; one instance may serve any number
/// of concurrent callers.
#[derive(Clone)]
pub struct ConditionalLogStore {
    client: Arc<dyn ObjectStoreClient>,
    precondition_marker: String,
}

impl std::fmt::Debug for ConditionalLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalLogStore")
            .field("precondition_marker", &self.precondition_marker)
            .finish_non_exhaustive()
    }
}

impl ConditionalLogStore {
    /// Create a log store over `client`.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::Config`] unless `config` asserts that the
    /// backing store is in atomic-write mode. This is permanent; retrying
    /// with the same configuration will fail the same way.
    pub fn try_new(client: Arc<dyn ObjectStoreClient>, config: &LogStoreConfig) -> Result<Self> {
        config.require_atomic_writes()?;
        Ok(Self {
            client,
            precondition_marker: config.precondition_marker.clone(),
        })
    }

    /// The underlying object store client.
    pub fn client(&self) -> &Arc<dyn ObjectStoreClient> {
        &self.client
    }

    /// Write any iterable of lines. See [`LogStore::write`].
    pub fn write_lines<I, S>(&self, key: &str, actions: I, overwrite: bool) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut actions = actions.into_iter().map(Into::into);
        self.write(key, &mut actions, overwrite)
    }

    fn stream_actions(
        &self,
        key: &str,
        actions: &mut dyn Iterator<Item = String>,
        overwrite: bool,
    ) -> io::Result<u64> {
        let mut stream = self.client.create(key, overwrite)?;
        let mut bytes_written = 0u64;
        for mut action in actions {
            action.push('\n');
            stream.write(action.as_bytes())?;
            bytes_written += action.len() as u64;
        }
        stream.close()?;
        Ok(bytes_written)
    }

    /// Decide what a failed create/write/close means.
    fn resolve_failure(&self, key: &str, err: io::Error) -> LogStoreError {
        if !is_precondition_failure(&err, &self.precondition_marker) {
            return LogStoreError::Io(err);
        }
        match self.client.exists(key) {
            Ok(true) => {
                debug!(key, "Lost create race to a concurrent writer");
                LogStoreError::AlreadyExists {
                    key: key.to_string(),
                }
            }
            Ok(false) => {
                error!(
                    key,
                    error = %err,
                    "Precondition failed but the object does not exist"
                );
                LogStoreError::ConcurrentWrite {
                    key: key.to_string(),
                }
            }
            Err(recheck) => LogStoreError::Io(recheck),
        }
    }
}

impl LogStore for ConditionalLogStore {
    #[instrument(skip(self), fields(key = %key))]
    fn read(&self, key: &str) -> Result<Vec<String>> {
        let data = self.client.get(key).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LogStoreError::NotFound {
                key: key.to_string(),
            },
            _ => LogStoreError::Io(e),
        })?;
        let text = std::str::from_utf8(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(text.split_terminator('\n').map(str::to_string).collect())
    }

    #[instrument(skip(self), fields(key = %key))]
    fn list_from(&self, key: &str) -> Result<Vec<String>> {
        let (dir, start) = match key.rsplit_once('/') {
            Some((dir, name)) => (format!("{dir}/"), name),
            None => (String::new(), key),
        };
        let mut keys: Vec<String> = self
            .client
            .list(&dir)?
            .into_iter()
            .filter(|k| {
                k.strip_prefix(dir.as_str())
                    .is_some_and(|name| !name.contains('/') && name >= start)
            })
            .collect();
        keys.sort();
        debug!("list_from {} → {} keys", key, keys.len());
        Ok(keys)
    }

    #[instrument(skip(self, actions), fields(key = %key))]
    fn write(
        &self,
        key: &str,
        actions: &mut dyn Iterator<Item = String>,
        overwrite: bool,
    ) -> Result<u64> {
        if !overwrite && self.client.exists(key)? {
            return Err(LogStoreError::AlreadyExists {
                key: key.to_string(),
            });
        }

        match self.stream_actions(key, actions, overwrite) {
            Ok(bytes_written) => {
                debug!(bytes_written, "Wrote log record");
                Ok(bytes_written)
            }
            Err(e) => Err(self.resolve_failure(key, e)),
        }
    }

    fn invalidate_cache(&self) {}

    fn is_partial_write_visible(&self, _key: &str) -> bool {
        false
    }
}
