// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The category of a cache [`Error`].
///
/// Every error produced by a backend or composite carries exactly one kind, so callers can
/// branch on expected outcomes such as [`ErrorKind::NotSupported`] without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A value could not be serialized on set.
    Encoding,
    /// A stored payload does not match the shape requested on get.
    Decoding,
    /// The error returned by a caller's miss loader, propagated verbatim.
    MissTriggered,
    /// The backend intentionally does not implement the operation.
    NotSupported,
    /// A remote call failed for a reason other than the key being absent.
    BackendUnavailable,
    /// A load-once cache missed and has no resolver configured.
    MissingLoader,
    /// Several independent failures, reported together.
    Aggregate,
}

impl ErrorKind {
    /// Returns a stable, lowercase name for the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encoding => "encoding",
            Self::Decoding => "decoding",
            Self::MissTriggered => "miss_triggered",
            Self::NotSupported => "not_supported",
            Self::BackendUnavailable => "backend_unavailable",
            Self::MissingLoader => "missing_loader",
            Self::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a cache operation.
///
/// The display form is the error message alone; use [`Error::kind`] to classify the failure and
/// [`std::error::Error::source()`] to reach an underlying cause such as a codec or network error.
///
/// # Example
///
/// ```
/// use tiercache_core::{Error, ErrorKind};
///
/// let error = Error::not_supported("flush");
/// assert_eq!(error.kind(), ErrorKind::NotSupported);
/// assert!(error.is_not_supported());
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxError>,
    removed: Option<bool>,
}

impl Error {
    /// Creates an error of the given kind with a message and no underlying cause.
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            removed: None,
        }
    }

    fn with_source(kind: ErrorKind, context: &str, cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        Self {
            kind,
            message: Cow::Owned(format!("{context}: {cause}")),
            source: Some(cause),
            removed: None,
        }
    }

    /// A value could not be serialized.
    pub fn encoding(cause: impl Into<BoxError>) -> Self {
        Self::with_source(ErrorKind::Encoding, "failed to encode cache value", cause)
    }

    /// A stored payload could not be deserialized into the requested type.
    pub fn decoding(cause: impl Into<BoxError>) -> Self {
        Self::with_source(ErrorKind::Decoding, "failed to decode cache value", cause)
    }

    /// Wraps a failure raised from inside a miss loader.
    ///
    /// The message is the cause's message unchanged so that the caller sees exactly what the
    /// loader reported.
    pub fn miss_triggered(cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        Self {
            kind: ErrorKind::MissTriggered,
            message: Cow::Owned(cause.to_string()),
            source: Some(cause),
            removed: None,
        }
    }

    /// The named operation is intentionally unimplemented by this backend.
    #[must_use]
    pub fn not_supported(operation: &'static str) -> Self {
        Self::new(ErrorKind::NotSupported, format!("{operation}: not supported"))
    }

    /// A backend call failed; `context` names what was being attempted.
    pub fn unavailable(context: &str, cause: impl Into<BoxError>) -> Self {
        Self::with_source(ErrorKind::BackendUnavailable, context, cause)
    }

    /// A load-once cache missed without a resolver.
    #[must_use]
    pub fn missing_loader() -> Self {
        Self::new(ErrorKind::MissingLoader, "missing loader")
    }

    /// Joins several failures into one, preserving each message in order.
    ///
    /// The message has the form `errors: <first>, <second>, ...`.
    #[must_use]
    pub fn aggregate(errors: Vec<Self>) -> Self {
        let joined = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        Self {
            kind: ErrorKind::Aggregate,
            message: Cow::Owned(format!("errors: {joined}")),
            source: Some(Box::new(Aggregated(errors))),
            removed: None,
        }
    }

    /// Copies an error that several callers are waiting on.
    ///
    /// The copy has the same kind and message, and the shared error as its source.
    #[must_use]
    pub fn from_shared(shared: Arc<Self>) -> Self {
        Self {
            kind: shared.kind,
            message: shared.message.clone(),
            removed: shared.removed,
            source: Some(Box::new(shared)),
        }
    }

    /// Records whether a delete removed the key from some tier before it failed.
    #[must_use]
    pub fn with_removed(mut self, removed: bool) -> Self {
        self.removed = Some(removed);
        self
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` when the backend does not implement the attempted operation.
    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        self.kind == ErrorKind::NotSupported
    }

    /// For a delete that stopped at a failing tier, returns whether an earlier tier removed the
    /// key. `None` for every other error.
    #[must_use]
    pub fn removed(&self) -> Option<bool> {
        self.removed
    }

    /// Returns the message without the kind.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The individual failures behind an [`ErrorKind::Aggregate`] error.
#[derive(Debug, thiserror::Error)]
#[error("{} errors", .0.len())]
struct Aggregated(Vec<Error>);

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn display_is_the_message() {
        let error = Error::new(ErrorKind::BackendUnavailable, "connection refused");
        assert_eq!(error.to_string(), "connection refused");
        assert_eq!(error.kind(), ErrorKind::BackendUnavailable);
    }

    #[test]
    fn codec_errors_keep_their_cause() {
        let cause = serde_json::from_str::<u32>("\"nope\"").expect_err("should not parse");
        let error = Error::decoding(cause);

        assert_eq!(error.kind(), ErrorKind::Decoding);
        assert!(error.to_string().starts_with("failed to decode cache value: "));
        assert!(error.source().is_some());
    }

    #[test]
    fn miss_triggered_preserves_loader_message() {
        let error = Error::miss_triggered("missing cache hit");
        assert_eq!(error.to_string(), "missing cache hit");
        assert_eq!(error.kind(), ErrorKind::MissTriggered);
    }

    #[test]
    fn not_supported_is_detectable() {
        let error = Error::not_supported("flush");
        assert!(error.is_not_supported());
        assert_eq!(error.message(), "flush: not supported");
        assert!(!Error::missing_loader().is_not_supported());
    }

    #[test]
    fn aggregate_joins_every_message() {
        let error = Error::aggregate(vec![
            Error::new(ErrorKind::BackendUnavailable, "first failed"),
            Error::new(ErrorKind::BackendUnavailable, "second failed"),
        ]);

        assert_eq!(error.kind(), ErrorKind::Aggregate);
        assert_eq!(error.to_string(), "errors: first failed, second failed");
        assert_eq!(error.source().map(ToString::to_string).as_deref(), Some("2 errors"));
    }

    #[test]
    fn shared_copy_keeps_kind_and_message() {
        let shared = Arc::new(Error::miss_triggered("ada is unknown"));
        let copy = Error::from_shared(Arc::clone(&shared));

        assert_eq!(copy.kind(), ErrorKind::MissTriggered);
        assert_eq!(copy.to_string(), "ada is unknown");
        assert_eq!(copy.source().map(ToString::to_string).as_deref(), Some("ada is unknown"));
    }

    #[test]
    fn removed_is_only_set_on_request() {
        let error = Error::new(ErrorKind::BackendUnavailable, "delete failed");
        assert_eq!(error.removed(), None);
        assert_eq!(error.with_removed(true).removed(), Some(true));
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(ErrorKind::Encoding.to_string(), "encoding");
        assert_eq!(ErrorKind::MissingLoader.as_str(), "missing_loader");
        assert_eq!(ErrorKind::NotSupported.as_str(), "not_supported");
    }
}
