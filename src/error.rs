//! Error types for retry operations.

use std::fmt;

/// Chronological record of every failure observed during one retry
/// invocation, including failed fallbacks.
///
/// The history is append-only and owned by a single invocation: entries are
/// recorded in the order the failures occurred and are never reordered or
/// deduplicated. The engine hands it back inside a
/// [`RetryResult`](crate::RetryResult) on success or a [`RetryError`] on
/// failure, so callers can always reconstruct what happened.
///
/// # Examples
///
/// ```rust
/// use resurge::{retry, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(2);
///
/// let err = retry(policy, || async { Err::<(), _>("boom") }).await.unwrap_err();
///
/// assert_eq!(err.history().len(), 2);
/// assert_eq!(err.history().last(), Some(&"boom"));
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorHistory<E> {
    entries: Vec<E>,
}

impl<E> ErrorHistory<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, error: E) {
        self.entries.push(error);
    }

    /// Number of failures recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no failure has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent failure, if any.
    pub fn last(&self) -> Option<&E> {
        self.entries.last()
    }

    /// Iterate failures in chronological order.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    /// View the failures as a slice, oldest first.
    pub fn as_slice(&self) -> &[E] {
        &self.entries
    }

    /// Consume the history, yielding the failures oldest first.
    pub fn into_vec(self) -> Vec<E> {
        self.entries
    }
}

impl<E> Default for ErrorHistory<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> IntoIterator for ErrorHistory<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a ErrorHistory<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Classified terminal failure of a retry invocation.
///
/// Every variant carries the attempt count at termination and the full
/// chronological [`ErrorHistory`]; the most recent underlying error is
/// reachable through [`last_error`](RetryError::last_error) and, when `E`
/// is an error type, through `std::error::Error::source`.
///
/// # Examples
///
/// ```rust
/// use resurge::{retry, RetryError, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(3);
///
/// let err = retry(policy, || async { Err::<(), _>("boom") }).await.unwrap_err();
///
/// assert!(matches!(err, RetryError::MaxAttemptsExceeded { .. }));
/// assert_eq!(err.attempts(), 3);
/// assert_eq!(err.history().len(), 3);
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The primary attempt budget was exhausted and no fallback was
    /// configured.
    MaxAttemptsExceeded {
        /// Primary invocations made.
        attempts: u32,
        /// Every failure observed, oldest first.
        history: ErrorHistory<E>,
    },
    /// The primary budget was exhausted and every configured fallback also
    /// failed.
    FallbackExhausted {
        /// Primary invocations made (fallback calls are not counted here,
        /// but their failures appear in the history).
        attempts: u32,
        /// Primary failures followed by fallback failures, oldest first.
        history: ErrorHistory<E>,
    },
    /// The retry predicate returned false: an operator decision to stop,
    /// not an exhausted budget. The fallback chain is deliberately not
    /// consulted.
    ConditionRejected {
        /// Primary invocations made before rejection.
        attempts: u32,
        /// Every failure observed, oldest first.
        history: ErrorHistory<E>,
    },
    /// Cancellation was observed at a checkpoint: before the first attempt,
    /// after a failed attempt, or during an inter-attempt delay.
    Aborted {
        /// Completed invocations at the point cancellation was seen; zero
        /// when cancelled before the first attempt.
        attempts: u32,
        /// Every failure observed before cancellation, oldest first.
        history: ErrorHistory<E>,
    },
}

impl<E> RetryError<E> {
    /// Attempt count at termination.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::MaxAttemptsExceeded { attempts, .. }
            | Self::FallbackExhausted { attempts, .. }
            | Self::ConditionRejected { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    /// The full chronological failure record.
    pub fn history(&self) -> &ErrorHistory<E> {
        match self {
            Self::MaxAttemptsExceeded { history, .. }
            | Self::FallbackExhausted { history, .. }
            | Self::ConditionRejected { history, .. }
            | Self::Aborted { history, .. } => history,
        }
    }

    /// Consume the error, keeping the failure record.
    pub fn into_history(self) -> ErrorHistory<E> {
        match self {
            Self::MaxAttemptsExceeded { history, .. }
            | Self::FallbackExhausted { history, .. }
            | Self::ConditionRejected { history, .. }
            | Self::Aborted { history, .. } => history,
        }
    }

    /// The most recent underlying error, if any attempt ran.
    pub fn last_error(&self) -> Option<&E> {
        self.history().last()
    }

    /// True for [`RetryError::MaxAttemptsExceeded`].
    pub fn is_max_attempts_exceeded(&self) -> bool {
        matches!(self, Self::MaxAttemptsExceeded { .. })
    }

    /// True for [`RetryError::FallbackExhausted`].
    pub fn is_fallback_exhausted(&self) -> bool {
        matches!(self, Self::FallbackExhausted { .. })
    }

    /// True for [`RetryError::ConditionRejected`].
    pub fn is_condition_rejected(&self) -> bool {
        matches!(self, Self::ConditionRejected { .. })
    }

    /// True for [`RetryError::Aborted`].
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxAttemptsExceeded { attempts, .. } => {
                write!(f, "max attempts ({}) exceeded", attempts)?;
            }
            Self::FallbackExhausted { attempts, .. } => {
                write!(
                    f,
                    "all fallbacks failed after {} primary attempts",
                    attempts
                )?;
            }
            Self::ConditionRejected { attempts, .. } => {
                write!(f, "retry condition returned false after {} attempts", attempts)?;
            }
            Self::Aborted { attempts, .. } => {
                write!(f, "retry aborted after {} attempts", attempts)?;
            }
        }
        if let Some(last) = self.last_error() {
            write!(f, ": {}", last)?;
        }
        Ok(())
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_error().map(|e| e as _)
    }
}
