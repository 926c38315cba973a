//! `object_store`-backed client, including S3-compatible storage.
//!
//! [`ObjectStoreBackend`] adapts any [`ObjectStore`] to the blocking
//! [`ObjectStoreClient`] seam. Streams buffer their bytes and publish with a
//! single `put_opts` on close: `PutMode::Create` for create-only writes
//! (the `If-None-Match: *` header on S3) and `PutMode::Overwrite` otherwise.
//! A single PUT is atomic, so no partial object is ever visible.

use std::future::Future;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutMode, PutOptions, PutPayload};
use tokio::runtime::Runtime;
use tracing::{debug, instrument};

use atomlog_core::{LogStoreError, ObjectStoreClient, PreconditionFailed, Result, WriteStream};

/// An [`ObjectStoreClient`] over any `object_store` implementation.
///
/// Calls block the current thread on an internal tokio runtime, so they
/// must not be made from inside another async runtime.
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    runtime: Arc<Runtime>,
}

impl std::fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBackend")
            .field("store", &self.store.to_string())
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl ObjectStoreBackend {
    /// Wrap `store`, placing every key under `prefix`.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("atomlog-io")
            .enable_all()
            .build()?;
        let prefix = prefix.into().trim_matches('/').to_string();
        Ok(Self {
            store,
            prefix,
            runtime: Arc::new(runtime),
        })
    }

    /// Create a backend from an S3 URI.
    ///
    /// # URI Format
    ///
    /// `s3://bucket/prefix?region=us-east-1&endpoint=http://minio:9000`
    ///
    /// Environment variables `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// and `AWS_REGION` are used as fallbacks for credentials and region.
    pub fn from_s3_uri(uri: &str) -> Result<Self> {
        let (bucket, prefix) = parse_s3_uri(uri)?;

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&bucket)
            .with_conditional_put(S3ConditionalPut::ETagMatch);

        if let Some(region) = extract_query_param(uri, "region") {
            builder = builder.with_region(&region);
        }

        // MinIO and other S3-compatible services
        if let Some(endpoint) = extract_query_param(uri, "endpoint") {
            builder = builder.with_endpoint(&endpoint).with_allow_http(true);
        }

        let store = builder.build().map_err(|e| {
            LogStoreError::config(format!("Failed to create S3 client for {uri}: {e}"))
        })?;

        debug!(bucket = %bucket, prefix = %prefix, "S3 backend initialised");
        Self::new(Arc::new(store), prefix)
    }

    /// Build the full object path from a key.
    fn full_path(&self, key: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{}", self.prefix, key))
        }
    }

    /// Strip the backend prefix to return keys relative to the storage root.
    fn relative_key(&self, location: &ObjectPath) -> String {
        let full_key = location.to_string();
        if self.prefix.is_empty() {
            return full_key;
        }
        full_key
            .strip_prefix(&format!("{}/", self.prefix))
            .unwrap_or(&full_key)
            .to_string()
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Translate an `object_store` error for `key` into the client's error shape.
fn map_store_error(key: &str, err: object_store::Error) -> io::Error {
    match err {
        e @ object_store::Error::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, e),
        // Some S3-compatible stores return Precondition instead of AlreadyExists
        e @ (object_store::Error::AlreadyExists { .. }
        | object_store::Error::Precondition { .. }) => {
            PreconditionFailed::with_source(key, e).into_io()
        }
        e => io::Error::other(e),
    }
}

impl ObjectStoreClient for ObjectStoreBackend {
    #[instrument(skip(self), fields(key = %key))]
    fn exists(&self, key: &str) -> io::Result<bool> {
        let path = self.full_path(key);
        match self.block_on(self.store.head(&path)) {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(map_store_error(key, e)),
        }
    }

    fn create(&self, key: &str, overwrite: bool) -> io::Result<Box<dyn WriteStream>> {
        Ok(Box::new(ObjectWriteStream {
            store: Arc::clone(&self.store),
            runtime: Arc::clone(&self.runtime),
            path: self.full_path(key),
            key: key.to_string(),
            overwrite,
            buf: Vec::new(),
        }))
    }

    #[instrument(skip(self), fields(key = %key))]
    fn get(&self, key: &str) -> io::Result<Bytes> {
        let path = self.full_path(key);
        self.block_on(async {
            let result = self.store.get(&path).await?;
            result.bytes().await
        })
        .map_err(|e| map_store_error(key, e))
    }

    #[instrument(skip(self), fields(prefix = %prefix))]
    fn list(&self, prefix: &str) -> io::Result<Vec<String>> {
        // object_store matches prefixes on whole path segments, so list the
        // enclosing directory and filter by the raw prefix here.
        let dir = prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let root = match (self.prefix.is_empty(), dir.is_empty()) {
            (true, true) => None,
            _ => Some(self.full_path(dir)),
        };

        let metas = self
            .block_on(self.store.list(root.as_ref()).try_collect::<Vec<ObjectMeta>>())
            .map_err(|e| map_store_error(prefix, e))?;

        let mut results: Vec<String> = metas
            .iter()
            .map(|meta| self.relative_key(&meta.location))
            .filter(|key| key.starts_with(prefix))
            .collect();
        results.sort();
        Ok(results)
    }
}

struct ObjectWriteStream {
    store: Arc<dyn ObjectStore>,
    runtime: Arc<Runtime>,
    path: ObjectPath,
    key: String,
    overwrite: bool,
    buf: Vec<u8>,
}

impl WriteStream for ObjectWriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    #[instrument(skip(self), fields(key = %self.key, size = self.buf.len()))]
    fn close(self: Box<Self>) -> io::Result<()> {
        let ObjectWriteStream {
            store,
            runtime,
            path,
            key,
            overwrite,
            buf,
        } = *self;
        let opts = PutOptions {
            mode: if overwrite {
                PutMode::Overwrite
            } else {
                PutMode::Create
            },
            ..Default::default()
        };
        runtime
            .block_on(store.put_opts(&path, PutPayload::from(buf), opts))
            .map_err(|e| map_store_error(&key, e))?;
        debug!("Put {}", path);
        Ok(())
    }
}

/// Parse an S3 URI into (bucket, prefix).
///
/// `s3://bucket/prefix/path` → `("bucket", "prefix/path")`
/// `s3://bucket` → `("bucket", "")`
fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let stripped = uri
        .strip_prefix("s3://")
        .ok_or_else(|| LogStoreError::config(format!("S3 URI must start with 's3://': {uri}")))?;

    let path_part = stripped.split('?').next().unwrap_or(stripped);

    let (bucket, prefix) = path_part.split_once('/').unwrap_or((path_part, ""));
    if bucket.is_empty() {
        return Err(LogStoreError::config(format!(
            "S3 URI must include a bucket name: {uri}"
        )));
    }

    Ok((bucket.to_string(), prefix.trim_matches('/').to_string()))
}

/// Extract a query parameter value from a URI.
fn extract_query_param(uri: &str, param: &str) -> Option<String> {
    let (_, query) = uri.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == param).then(|| value.to_string())
    })
}
