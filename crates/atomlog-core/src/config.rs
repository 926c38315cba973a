//! Log store configuration.
//!
//! [`LogStoreConfig`] names the backing store and asserts that it is
//! configured for atomic writes. The assertion is checked once, when a log
//! store is constructed, and never per call.

use serde::{Deserialize, Serialize};

use crate::error::LogStoreError;
use crate::precondition::PRECONDITION_FAILED_MARKER;
use crate::Result;

/// Configuration for a conditional log store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStoreConfig {
    /// Storage URI: `"local://~/.atomlog/data"`, `"memory://"`, or
    /// `"s3://bucket/prefix?region=us-east-1"`.
    pub storage_uri: String,

    /// Whether the backing store is configured for atomic writes.
    ///
    /// `None` means the setting was never provided, which is treated the
    /// same as `Some(false)`: a fatal misconfiguration.
    #[serde(default)]
    pub atomic_writes: Option<bool>,

    /// Substring identifying a failed create-only precondition in the
    /// store's error messages.
    #[serde(default = "default_marker")]
    pub precondition_marker: String,
}

fn default_marker() -> String {
    PRECONDITION_FAILED_MARKER.to_string()
}

impl LogStoreConfig {
    /// Create a config for `storage_uri` with atomic writes unset.
    pub fn new(storage_uri: impl Into<String>) -> Self {
        Self {
            storage_uri: storage_uri.into(),
            atomic_writes: None,
            precondition_marker: default_marker(),
        }
    }

    /// Set the atomic-writes assertion.
    pub fn with_atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = Some(enabled);
        self
    }

    /// Override the precondition marker.
    pub fn with_precondition_marker(mut self, marker: impl Into<String>) -> Self {
        self.precondition_marker = marker.into();
        self
    }

    /// Fail unless the store is asserted to be in atomic-write mode.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::Config`] when the flag is missing or false,
    /// or when the precondition marker is empty (it would match anything).
    pub fn require_atomic_writes(&self) -> Result<()> {
        match self.atomic_writes {
            Some(true) => {}
            Some(false) => {
                return Err(LogStoreError::config(format!(
                    "atomic writes are disabled for {}; conditional log writes require them",
                    self.storage_uri
                )))
            }
            None => {
                return Err(LogStoreError::config(format!(
                    "atomic_writes is not set for {}; conditional log writes require it",
                    self.storage_uri
                )))
            }
        }
        if self.precondition_marker.is_empty() {
            return Err(LogStoreError::config("precondition_marker must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_leaves_atomic_writes_unset() {
        let config = LogStoreConfig::new("memory://");
        assert_eq!(config.atomic_writes, None);
        assert_eq!(config.precondition_marker, PRECONDITION_FAILED_MARKER);
        assert!(matches!(
            config.require_atomic_writes(),
            Err(LogStoreError::Config { .. })
        ));
    }

    #[test]
    fn test_disabled_atomic_writes_rejected() {
        let config = LogStoreConfig::new("memory://").with_atomic_writes(false);
        let err = config.require_atomic_writes().unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_enabled_atomic_writes_accepted() {
        let config = LogStoreConfig::new("memory://").with_atomic_writes(true);
        config.require_atomic_writes().unwrap();
    }

    #[test]
    fn test_empty_marker_rejected() {
        let config = LogStoreConfig::new("memory://")
            .with_atomic_writes(true)
            .with_precondition_marker("");
        assert!(config.require_atomic_writes().is_err());
    }

    #[test]
    fn test_config_deserialization_defaults() {
        let config: LogStoreConfig =
            serde_json::from_str(r#"{"storage_uri": "s3://bucket/prefix"}"#).unwrap();
        assert_eq!(config.storage_uri, "s3://bucket/prefix");
        assert_eq!(config.atomic_writes, None);
        assert_eq!(config.precondition_marker, PRECONDITION_FAILED_MARKER);
    }

    #[test]
    fn test_config_serialization() {
        let config = LogStoreConfig::new("local:///tmp/log").with_atomic_writes(true);
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: LogStoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);
    }
}
