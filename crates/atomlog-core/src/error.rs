//! Unified error types for atomlog.
//!
//! All log store failures are represented by [`LogStoreError`]. Only
//! [`LogStoreError::AlreadyExists`] is a legitimate concurrency signal;
//! everything else is an operational fault.

use std::io;

use thiserror::Error;

/// The unified error type for all log store operations.
#[derive(Error, Debug)]
pub enum LogStoreError {
    /// The target already exists and an exclusive create was requested,
    /// or a concurrent writer won the race for it.
    #[error("File already exists: {key}")]
    AlreadyExists {
        /// The storage key that already exists.
        key: String,
    },

    /// The store rejected a conditional write, yet the target is absent.
    ///
    /// This is an internal inconsistency, not a lost race, and must not be
    /// retried as if it were [`LogStoreError::AlreadyExists`].
    #[error("Failed to write to {key}: precondition failed but the object does not exist")]
    ConcurrentWrite {
        /// The storage key that was being written.
        key: String,
    },

    /// The requested key was not found in storage.
    #[error("Not found: {key}")]
    NotFound {
        /// The storage key that was not found.
        key: String,
    },

    /// Invalid configuration was provided.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// Any other storage failure, passed through unmodified.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LogStoreError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller may treat this as a lost commit race.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
