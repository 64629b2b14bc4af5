//! Transient-error predicates for building retry conditions.
//!
//! The engine knows nothing about HTTP or sockets; it only asks a
//! caller-supplied predicate whether an error is worth retrying. This module
//! supplies the common transport-flavored answer: a set of retryable HTTP
//! status codes, a set of network-level error codes, and predicate builders
//! over them. Everything here is pure classification - no I/O.
//!
//! # Example
//!
//! ```rust
//! use resurge::predicate::{transient, TransportError};
//! use resurge::{Retry, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! #[derive(Debug)]
//! struct HttpError { status: u16 }
//!
//! impl TransportError for HttpError {
//!     fn status(&self) -> Option<u16> {
//!         Some(self.status)
//!     }
//! }
//!
//! let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(3);
//!
//! // 404 is not transient: one attempt, immediate rejection
//! let err = Retry::new(policy)
//!     .retry_if(transient())
//!     .run(|| async { Err::<(), _>(HttpError { status: 404 }) })
//!     .await
//!     .unwrap_err();
//!
//! assert!(err.is_condition_rejected());
//! # });
//! ```

/// Status codes worth retrying by default: request timeout, rate limiting,
/// and the transient 5xx family.
pub const DEFAULT_RETRY_STATUS_CODES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// OS-level network error codes treated as transient.
pub const NETWORK_ERROR_CODES: &[&str] = &[
    "ECONNRESET",
    "ECONNREFUSED",
    "ECONNABORTED",
    "ETIMEDOUT",
    "ENETUNREACH",
    "EHOSTUNREACH",
];

/// Transport-level classification an error type may expose.
///
/// Both methods default to `None`, so an implementation only reports what
/// it actually knows: an HTTP client error carries a status, a socket error
/// carries an OS code, and an application error may carry neither (and is
/// then never classified as transient).
pub trait TransportError {
    /// HTTP status code associated with this error, if any.
    fn status(&self) -> Option<u16> {
        None
    }

    /// OS-level error code string (for example `ECONNRESET`), if any.
    fn code(&self) -> Option<&str> {
        None
    }
}

/// True when the error carries a code from [`NETWORK_ERROR_CODES`].
pub fn is_network_error<E: TransportError>(error: &E) -> bool {
    error
        .code()
        .is_some_and(|code| NETWORK_ERROR_CODES.contains(&code))
}

/// True when the error carries a status found in `status_codes`.
pub fn is_retryable_status<E: TransportError>(error: &E, status_codes: &[u16]) -> bool {
    error
        .status()
        .is_some_and(|status| status_codes.contains(&status))
}

/// The default transport predicate: network errors and
/// [`DEFAULT_RETRY_STATUS_CODES`] are transient, everything else is not.
///
/// Suitable for passing straight to [`Retry::retry_if`](crate::Retry::retry_if).
pub fn transient<E: TransportError>() -> impl Fn(&E) -> bool + Send + Sync {
    |error| is_network_error(error) || is_retryable_status(error, DEFAULT_RETRY_STATUS_CODES)
}

#[cfg(test)]
mod predicate_tests {
    use super::*;

    #[derive(Debug)]
    struct TestError {
        status: Option<u16>,
        code: Option<&'static str>,
    }

    impl TransportError for TestError {
        fn status(&self) -> Option<u16> {
            self.status
        }

        fn code(&self) -> Option<&str> {
            self.code
        }
    }

    fn status(status: u16) -> TestError {
        TestError {
            status: Some(status),
            code: None,
        }
    }

    fn code(code: &'static str) -> TestError {
        TestError {
            status: None,
            code: Some(code),
        }
    }

    #[test]
    fn test_network_codes_are_transient() {
        for c in NETWORK_ERROR_CODES {
            assert!(is_network_error(&code(c)), "{c} should be transient");
        }
        assert!(!is_network_error(&code("ENOENT")));
        assert!(!is_network_error(&status(500)));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(&status(503), DEFAULT_RETRY_STATUS_CODES));
        assert!(is_retryable_status(&status(429), DEFAULT_RETRY_STATUS_CODES));
        assert!(!is_retryable_status(&status(404), DEFAULT_RETRY_STATUS_CODES));
        assert!(!is_retryable_status(&code("ETIMEDOUT"), DEFAULT_RETRY_STATUS_CODES));
    }

    #[test]
    fn test_custom_status_set() {
        assert!(is_retryable_status(&status(418), &[418]));
        assert!(!is_retryable_status(&status(503), &[418]));
    }

    #[test]
    fn test_transient_combines_both_checks() {
        let is_transient = transient::<TestError>();

        assert!(is_transient(&status(502)));
        assert!(is_transient(&code("ECONNRESET")));
        assert!(!is_transient(&status(400)));
        assert!(!is_transient(&TestError {
            status: None,
            code: None,
        }));
    }
}
