//! Error type for API calls and bulk runs, plus the aggregated outcome of a bulk run.
//!
//! Errors fall in two classes. Fatal errors ([`ApiError::ThresholdReached`] and
//! [`ApiError::Cancelled`]) mean the whole run has been stopped; every other
//! variant belongs to one item and leaves its siblings running. Use
//! [`ApiError::is_fatal`] to branch, never the message text.

use crate::budget::CancelReason;
use reqwest::{Method, StatusCode};
use url::Url;
use std::time::Duration;
use thiserror::Error;

/// Error type for everything the engine does.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server reported a remaining call count at or below the threshold.
    #[error("call threshold of {threshold} reached, {remaining} calls remaining")]
    ThresholdReached { remaining: u64, threshold: u64 },

    /// The run was cancelled before or while this call was in flight.
    #[error("{method} {url}: {reason}")]
    Cancelled {
        method: Method,
        url: Url,
        reason: CancelReason,
    },

    /// The call and all of its retries did not finish within the request timeout.
    #[error("{method} {url}: no response within {after:?}")]
    TimedOut {
        method: Method,
        url: Url,
        after: Duration,
    },

    /// The server answered with a status that is not success for the method.
    #[error("{method} {url} failed [{status}]\n{body}")]
    Status {
        method: Method,
        url: Url,
        status: StatusCode,
        body: String,
    },

    /// The response body could not be read.
    #[error("{method} {url}: reading response body failed: {source}")]
    Body {
        method: Method,
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    /// A response body was not the XML document we expected.
    #[error("unmarshalling {what} XML failed: {source}\n{body}")]
    Decode {
        what: &'static str,
        body: String,
        #[source]
        source: quick_xml::DeError,
    },

    /// A record could not be serialized for a write.
    #[error("marshalling {what} XML failed: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: quick_xml::DeError,
    },

    /// A link or path could not be turned into a request URL.
    #[error("invalid request target '{target}': {source}")]
    InvalidUrl {
        target: String,
        #[source]
        source: url::ParseError,
    },

    /// No set's trimmed name equals the requested name.
    #[error("no set with name '{name}' found")]
    SetNotFound { name: String },

    /// Deduplicated member count differs from the set's declared size.
    #[error("{found} members found for set '{set}' with size {expected}")]
    CountMismatch {
        set: String,
        found: usize,
        expected: usize,
    },

    /// The set exists but is not the kind of set the operation works on.
    #[error("set '{set}' is a {kind} set of {content}, expected a {expected}")]
    WrongSetKind {
        set: String,
        kind: String,
        content: String,
        expected: &'static str,
    },

    /// A record was missing the link needed to act on it.
    #[error("the {what} did not have an associated link")]
    MissingLink { what: &'static str },

    /// The HTTP client could not be built or could not build a request.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ApiError {
    /// True when the error means the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApiError::ThresholdReached { .. } | ApiError::Cancelled { .. }
        )
    }

    /// True when the call budget has been exhausted.
    pub fn is_threshold(&self) -> bool {
        matches!(self, ApiError::ThresholdReached { .. })
    }
}

/// Convenience type alias for [`std::result::Result`] with [`ApiError`].
pub type Result<T> = std::result::Result<T, ApiError>;

/// Accumulated result of a bulk run: what succeeded and what failed.
///
/// Ordering of both vectors is unspecified.
#[derive(Debug)]
pub struct BulkOutcome<T> {
    pub succeeded: Vec<T>,
    pub failures: Vec<ApiError>,
}

impl<T> Default for BulkOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BulkOutcome<T> {
    pub fn new(succeeded: Vec<T>, failures: Vec<ApiError>) -> Self {
        Self { succeeded, failures }
    }

    /// No item failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// The first stop-the-world error, if the run was cancelled.
    ///
    /// A threshold error is preferred over a plain cancellation so callers
    /// can report why the run stopped.
    pub fn fatal(&self) -> Option<&ApiError> {
        self.failures
            .iter()
            .find(|e| e.is_threshold())
            .or_else(|| self.failures.iter().find(|e| e.is_fatal()))
    }

    /// Errors that belong to single items.
    pub fn item_failures(&self) -> impl Iterator<Item = &ApiError> {
        self.failures.iter().filter(|e| !e.is_fatal())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> BulkOutcome<U> {
        BulkOutcome {
            succeeded: self.succeeded.into_iter().map(f).collect(),
            failures: self.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://api.example.org/almaws/v1/conf/sets").unwrap()
    }

    #[test]
    fn test_fatal_classification() {
        let threshold = ApiError::ThresholdReached {
            remaining: 10,
            threshold: 50,
        };
        let cancelled = ApiError::Cancelled {
            method: Method::GET,
            url: url(),
            reason: CancelReason::Interrupted,
        };
        let status = ApiError::Status {
            method: Method::GET,
            url: url(),
            status: StatusCode::BAD_REQUEST,
            body: "nope".into(),
        };
        let mismatch = ApiError::CountMismatch {
            set: "s".into(),
            found: 1,
            expected: 2,
        };

        assert!(threshold.is_fatal());
        assert!(threshold.is_threshold());
        assert!(cancelled.is_fatal());
        assert!(!cancelled.is_threshold());
        assert!(!status.is_fatal());
        assert!(!mismatch.is_fatal());
    }

    #[test]
    fn test_status_error_message_carries_diagnostics() {
        let err = ApiError::Status {
            method: Method::DELETE,
            url: url(),
            status: StatusCode::OK,
            body: "<error>x</error>".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DELETE"));
        assert!(msg.contains("/almaws/v1/conf/sets"));
        assert!(msg.contains("200"));
        assert!(msg.contains("<error>x</error>"));
    }

    #[test]
    fn test_outcome_prefers_threshold_as_fatal() {
        let outcome: BulkOutcome<()> = BulkOutcome::new(
            vec![(), ()],
            vec![
                ApiError::SetNotFound { name: "a".into() },
                ApiError::Cancelled {
                    method: Method::GET,
                    url: url(),
                    reason: CancelReason::Interrupted,
                },
                ApiError::ThresholdReached {
                    remaining: 1,
                    threshold: 2,
                },
            ],
        );
        assert!(!outcome.is_clean());
        assert_eq!(outcome.failure_count(), 3);
        assert!(outcome.fatal().unwrap().is_threshold());
        assert_eq!(outcome.item_failures().count(), 1);
    }

    #[test]
    fn test_clean_outcome_has_no_fatal() {
        let outcome = BulkOutcome::new(vec![1, 2, 3], Vec::new());
        assert!(outcome.is_clean());
        assert!(outcome.fatal().is_none());
        let doubled = outcome.map(|n| n * 2);
        assert_eq!(doubled.succeeded, vec![2, 4, 6]);
    }
}
