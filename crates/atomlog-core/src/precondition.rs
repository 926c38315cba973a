//! Recognising failed create-only preconditions in store errors.
//!
//! Object store clients rarely hand back a typed "someone else created this
//! first" error. The signal arrives as a message buried somewhere in an
//! error's cause chain, often wrapped by retry or adapter layers. The
//! classifier therefore scans every cause, not just the top-level error.

use std::error::Error;
use std::io;

use thiserror::Error;

/// Message fragment identifying a rejected create-only write.
pub const PRECONDITION_FAILED_MARKER: &str = "412 Precondition Failed";

/// A store rejected a create-only write because the target already exists.
///
/// Backends return this wrapped in an [`io::Error`] (see
/// [`PreconditionFailed::into_io`]) from `create`, `write`, or `close`,
/// wherever the store enforces the precondition.
#[derive(Error, Debug)]
#[error("412 Precondition Failed: conditional create rejected for {key}")]
pub struct PreconditionFailed {
    /// The key whose create-only write was rejected.
    pub key: String,
    /// The store's native error, if any.
    #[source]
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl PreconditionFailed {
    /// A precondition failure with no underlying store error.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: None,
        }
    }

    /// A precondition failure caused by a native store error.
    pub fn with_source(
        key: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap into an [`io::Error`] of kind [`io::ErrorKind::AlreadyExists`].
    pub fn into_io(self) -> io::Error {
        io::Error::new(io::ErrorKind::AlreadyExists, self)
    }
}

/// Iterate over `err` followed by each of its underlying causes.
pub fn error_chain<'a>(
    err: &'a (dyn Error + 'static),
) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// Returns `true` if any message in the ordered sequence contains `marker`.
///
/// Absent messages are skipped.
pub fn chain_contains_marker<I, S>(messages: I, marker: &str) -> bool
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    messages
        .into_iter()
        .flatten()
        .any(|message| message.as_ref().contains(marker))
}

/// Returns `true` if `e` is a [`PreconditionFailed`], directly or as the
/// payload of an [`io::Error`].
fn is_typed_precondition(e: &(dyn Error + 'static)) -> bool {
    if e.is::<PreconditionFailed>() {
        return true;
    }
    // io::Error::source() skips its own payload, so look inside explicitly.
    e.downcast_ref::<io::Error>()
        .and_then(|io| io.get_ref())
        .is_some_and(|inner| inner.is::<PreconditionFailed>())
}

/// Returns `true` if `err` or any of its causes reports a failed
/// create-only precondition.
///
/// A typed [`PreconditionFailed`] anywhere in the chain always counts,
/// whatever `marker` is; otherwise a cause's message must contain `marker`.
pub fn is_precondition_failure(err: &(dyn Error + 'static), marker: &str) -> bool {
    if error_chain(err).any(is_typed_precondition) {
        return true;
    }
    let messages = error_chain(err).map(|e| {
        let message = e.to_string();
        (!message.is_empty()).then_some(message)
    });
    chain_contains_marker(messages, marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug)]
    #[error("{message}")]
    struct Layer {
        message: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    }

    fn layer(message: &str, source: Option<Box<dyn Error + Send + Sync>>) -> Layer {
        Layer {
            message: message.to_string(),
            source,
        }
    }

    #[test]
    fn test_marker_in_top_level_error() {
        let err = PreconditionFailed::new("t/_log/3.json");
        assert!(err.to_string().contains(PRECONDITION_FAILED_MARKER));
        assert!(is_precondition_failure(&err, PRECONDITION_FAILED_MARKER));
    }

    #[test]
    fn test_marker_buried_in_cause_chain() {
        let root = layer("HTTP 412 Precondition Failed from upstream", None);
        let retry = layer("request failed after 3 retries", Some(Box::new(root)));
        let adapter = layer("upload aborted", Some(Box::new(retry)));
        let err = io::Error::other(adapter);
        assert!(is_precondition_failure(&err, PRECONDITION_FAILED_MARKER));
    }

    #[test]
    fn test_no_marker_anywhere() {
        let root = layer("connection reset by peer", None);
        let err = io::Error::other(layer("upload aborted", Some(Box::new(root))));
        assert!(!is_precondition_failure(&err, PRECONDITION_FAILED_MARKER));
    }

    #[test]
    fn test_empty_messages_are_skipped() {
        let root = layer("", None);
        let err = layer("", Some(Box::new(root)));
        assert!(!is_precondition_failure(&err, PRECONDITION_FAILED_MARKER));
    }

    #[test]
    fn test_io_wrapped_precondition() {
        let err = PreconditionFailed::new("k").into_io();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(is_precondition_failure(&err, PRECONDITION_FAILED_MARKER));
    }

    #[test]
    fn test_typed_failure_matches_any_marker() {
        let err = PreconditionFailed::new("k").into_io();
        assert!(is_precondition_failure(&err, "conditionNotMet"));

        let wrapped = layer("upload aborted", Some(Box::new(PreconditionFailed::new("k"))));
        assert!(is_precondition_failure(&wrapped, "conditionNotMet"));

        let untyped = io::Error::other("HTTP 412 Precondition Failed");
        assert!(!is_precondition_failure(&untyped, "conditionNotMet"));
    }

    #[test]
    fn test_chain_contains_marker_over_plain_sequence() {
        let messages = vec![None, Some("timeout"), Some("code=412 Precondition Failed")];
        assert!(chain_contains_marker(messages, PRECONDITION_FAILED_MARKER));
        let messages: Vec<Option<&str>> = vec![None, None];
        assert!(!chain_contains_marker(messages, PRECONDITION_FAILED_MARKER));
    }

    #[test]
    fn test_error_chain_order() {
        let err = layer("outer", Some(Box::new(layer("inner", None))));
        let messages: Vec<String> = error_chain(&err).map(|e| e.to_string()).collect();
        assert_eq!(messages, vec!["outer", "inner"]);
    }
}
