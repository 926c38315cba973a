//! Storage URI dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use atomlog_core::{LogStoreConfig, LogStoreError, ObjectStoreClient, Result};

use crate::local::LocalStore;
use crate::log_writer::ConditionalLogStore;
use crate::memory::MemoryStore;
use crate::s3::ObjectStoreBackend;

/// Open the object store client named by `uri`.
///
/// Supported forms: `s3://bucket/prefix?region=..`, `memory://`, and
/// `local://<path>` or a bare filesystem path (`~/` is expanded).
pub fn open_client(uri: &str) -> Result<Arc<dyn ObjectStoreClient>> {
    if uri.starts_with("s3://") {
        return Ok(Arc::new(ObjectStoreBackend::from_s3_uri(uri)?));
    }
    if uri == "memory://" {
        return Ok(Arc::new(MemoryStore::new()));
    }

    let path = match uri.strip_prefix("local://") {
        Some(path) => path,
        None if uri.contains("://") => {
            return Err(LogStoreError::config(format!(
                "Unsupported storage URI scheme: {uri}"
            )))
        }
        None => uri,
    };
    if path.is_empty() {
        return Err(LogStoreError::config("Local storage URI must include a path"));
    }
    Ok(Arc::new(LocalStore::new(expand_home(path)?)?))
}

/// Open a [`ConditionalLogStore`] for `config.storage_uri`.
pub fn open_log_store(config: &LogStoreConfig) -> Result<ConditionalLogStore> {
    // Fail on misconfiguration before touching storage.
    config.require_atomic_writes()?;
    let client = open_client(&config.storage_uri)?;
    let store = ConditionalLogStore::try_new(client, config)?;
    info!(storage_uri = %config.storage_uri, "Conditional log store opened");
    Ok(store)
}

fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => {
            let home = home_dir()
                .ok_or_else(|| LogStoreError::config("Cannot determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
