//! Filesystem-backed object store client for solo use and local development.
//!
//! [`LocalStore`] implements [`ObjectStoreClient`] on the local filesystem.
//! A stream stages its bytes in a hidden temp file beside the target and
//! publishes on close: create-only writes use `hard_link`, which fails
//! atomically if the target exists, and overwrites use `rename`. Readers
//! never see a partially written object under its key.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use atomlog_core::{ObjectStoreClient, PreconditionFailed, Result, WriteStream};

/// Suffix of in-flight temp files; they are hidden from listings.
const TEMP_SUFFIX: &str = ".tmp";

/// An [`ObjectStoreClient`] backed by the local filesystem.
///
/// All keys are mapped to paths under the configured `base_dir`.
/// Parent directories are created automatically on `create`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_dir: PathBuf,
}

impl LocalStore {
    /// Create a new `LocalStore` rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        debug!(base_dir = %base_dir.display(), "LocalStore initialised");
        Ok(Self { base_dir })
    }

    /// Return the full filesystem path for a storage key.
    ///
    /// Keys are relative paths below the base directory; absolute keys and
    /// `..` segments are rejected.
    fn key_to_path(&self, key: &str) -> io::Result<PathBuf> {
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("key escapes the store root: {key:?}"),
            ));
        }
        Ok(self.base_dir.join(relative))
    }

    /// Return the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ObjectStoreClient for LocalStore {
    #[instrument(skip(self), fields(key = %key))]
    fn exists(&self, key: &str) -> io::Result<bool> {
        let exists = self.key_to_path(key)?.try_exists()?;
        debug!("exists {} → {}", key, exists);
        Ok(exists)
    }

    #[instrument(skip(self), fields(key = %key))]
    fn create(&self, key: &str, overwrite: bool) -> io::Result<Box<dyn WriteStream>> {
        let target = self.key_to_path(key)?;
        let (parent, file_name) = match (target.parent(), target.file_name()) {
            (Some(parent), Some(name)) if !key.is_empty() && !key.ends_with('/') => {
                (parent, name.to_string_lossy())
            }
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a file key: {key:?}"),
                ))
            }
        };
        fs::create_dir_all(parent)?;

        let temp = parent.join(format!(".{file_name}.{}{TEMP_SUFFIX}", Uuid::new_v4()));
        let file = OpenOptions::new().write(true).create_new(true).open(&temp)?;

        Ok(Box::new(LocalWriteStream {
            key: key.to_string(),
            file: Some(file),
            temp,
            target,
            overwrite,
            published: false,
        }))
    }

    #[instrument(skip(self), fields(key = %key))]
    fn get(&self, key: &str) -> io::Result<Bytes> {
        let data = fs::read(self.key_to_path(key)?)?;
        debug!("Get {} bytes from {}", data.len(), key);
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(prefix = %prefix))]
    fn list(&self, prefix: &str) -> io::Result<Vec<String>> {
        let mut results = Vec::new();
        list_recursive(&self.base_dir, &self.base_dir, prefix, &mut results)?;
        results.sort();
        debug!("Listed {} keys with prefix '{}'", results.len(), prefix);
        Ok(results)
    }
}

/// A staged write; the temp file is removed unless it was published.
struct LocalWriteStream {
    key: String,
    file: Option<File>,
    temp: PathBuf,
    target: PathBuf,
    overwrite: bool,
    published: bool,
}

impl LocalWriteStream {
    fn publish(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        if self.overwrite {
            fs::rename(&self.temp, &self.target)?;
            self.published = true;
            return Ok(());
        }
        match fs::hard_link(&self.temp, &self.target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(PreconditionFailed::with_source(self.key.clone(), e).into_io())
            }
            Err(e) => Err(e),
        }
    }
}

impl WriteStream for LocalWriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(buf),
            None => Err(io::Error::other("write after close")),
        }
    }

    #[instrument(skip(self), fields(key = %self.key))]
    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.publish()?;
        debug!("Published {}", self.target.display());
        Ok(())
    }
}

impl Drop for LocalWriteStream {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        if let Err(e) = fs::remove_file(&self.temp) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(temp = %self.temp.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
}

fn is_temp_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// Recursively list all files under `dir`, producing keys relative to `base`.
fn list_recursive(
    base: &Path,
    dir: &Path,
    prefix: &str,
    results: &mut Vec<String>,
) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            list_recursive(base, &path, prefix, results)?;
            continue;
        }
        if is_temp_file(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let relative = path
            .strip_prefix(base)
            .map_err(|e| io::Error::other(format!("Path prefix strip failed: {e}")))?;
        // Forward slashes regardless of platform
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        if key.starts_with(prefix) {
            results.push(key);
        }
    }

    Ok(())
}
