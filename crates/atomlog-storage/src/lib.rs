//! Conditional log store and object store client backends for atomlog.
//!
//! - [`ConditionalLogStore`] — the [`LogStore`](atomlog_core::LogStore)
//!   variant that turns an atomic create-only primitive into exclusive,
//!   conflict-detecting log record creation
//! - [`LocalStore`] — filesystem-backed client for solo use and development
//! - [`MemoryStore`] — in-process client
//! - [`ObjectStoreBackend`] — any `object_store` implementation, including
//!   S3-compatible endpoints

pub mod local;
pub mod log_writer;
pub mod memory;
pub mod open;
pub mod s3;

pub use local::LocalStore;
pub use log_writer::ConditionalLogStore;
pub use memory::MemoryStore;
pub use open::{open_client, open_log_store};
pub use s3::ObjectStoreBackend;
