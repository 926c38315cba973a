//! atomlog core traits, configuration, and errors.
//!
//! This crate provides the foundational building blocks shared by every
//! atomlog backend: the [`ObjectStoreClient`] seam consumed by log stores,
//! the [`LogStore`] capability exposed to the transactional log protocol,
//! store configuration, precondition-failure classification, and the
//! unified error type.

pub mod config;
pub mod error;
pub mod log_store;
pub mod precondition;
pub mod storage;

pub use config::LogStoreConfig;
pub use error::LogStoreError;
pub use log_store::LogStore;
pub use precondition::{is_precondition_failure, PreconditionFailed, PRECONDITION_FAILED_MARKER};
pub use storage::{ObjectStoreClient, WriteStream};

/// Convenience Result type using [`LogStoreError`].
pub type Result<T> = std::result::Result<T, LogStoreError>;
