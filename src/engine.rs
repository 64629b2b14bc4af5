//! The retry engine: drives an operation through attempts, delays, and
//! fallbacks.
//!
//! [`Retry`] is the imperative shell around the pure pieces: it owns one
//! invocation's bookkeeping (attempt counter, error history, previous
//! delay), consults [`compute_delay`] between attempts, observes
//! cancellation through the caller's token, and on exhaustion walks the
//! fallback chain. Concurrent invocations are fully independent; the engine
//! never mutates a policy, predicate, or callback the caller shares.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

use crate::cancel::{AbortGate, SleepOutcome};
use crate::delay::compute_delay;
use crate::error::{ErrorHistory, RetryError};
use crate::policy::RetryPolicy;

type RetryPredicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type RetryHook<E> = Box<dyn Fn(&E, u32) + Send + Sync>;
type Fallback<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Successful outcome of a retry invocation, with bookkeeping metadata.
///
/// `attempts` is the 1-based index of the call that succeeded; when success
/// came from a fallback it reports the primary budget instead, since every
/// primary attempt ran. `errors` holds whatever failures preceded success,
/// oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryResult<T, E> {
    /// The value produced by the successful call.
    pub value: T,
    /// 1-based index of the successful call (`max_attempts` for fallback
    /// successes).
    pub attempts: u32,
    /// Wall-clock time from the start of the invocation to success.
    pub total_elapsed: Duration,
    /// Failures observed before success, oldest first.
    pub errors: ErrorHistory<E>,
}

impl<T, E> RetryResult<T, E> {
    /// Extract the success value, discarding metadata.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the success value.
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Builder for a single retry invocation.
///
/// A [`RetryPolicy`] supplies the numeric schedule; the builder layers on
/// the behavioral hooks: a retry-eligibility predicate, an observer
/// callback, an ordered fallback chain, and a cancellation token. `run`
/// consumes the builder and drives the operation.
///
/// # Examples
///
/// ```rust
/// use resurge::{Retry, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(3);
///
/// let mut calls = 0u32;
/// let result = Retry::new(policy)
///     .run(|| {
///         calls += 1;
///         let n = calls;
///         async move { if n < 3 { Err("flaky") } else { Ok(n) } }
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(result.value, 3);
/// assert_eq!(result.attempts, 3);
/// assert_eq!(result.errors.len(), 2);
/// # });
/// ```
///
/// Cancellation uses a shared token; cancelling during a delay interrupts
/// it rather than letting it run out:
///
/// ```rust
/// use resurge::{Retry, RetryPolicy};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # tokio_test::block_on(async {
/// let token = CancellationToken::new();
/// token.cancel();
///
/// let err = Retry::new(RetryPolicy::default())
///     .with_cancel_token(token)
///     .run(|| async { Ok::<_, String>(42) })
///     .await
///     .unwrap_err();
///
/// assert!(err.is_aborted());
/// assert_eq!(err.attempts(), 0); // the operation never ran
/// # });
/// ```
pub struct Retry<T, E> {
    policy: RetryPolicy,
    retry_if: Option<RetryPredicate<E>>,
    on_retry: Option<RetryHook<E>>,
    fallbacks: Vec<Fallback<T, E>>,
    cancel: Option<CancellationToken>,
    seed: Option<u64>,
}

impl<T, E> Retry<T, E> {
    /// Create an invocation builder from a policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            retry_if: None,
            on_retry: None,
            fallbacks: Vec::new(),
            cancel: None,
            seed: None,
        }
    }

    /// Gate retries on a per-error predicate.
    ///
    /// After a failed attempt (other than the last), the predicate decides
    /// whether the error is worth retrying. Returning `false` ends the run
    /// immediately with [`RetryError::ConditionRejected`], skipping any
    /// configured fallbacks: the predicate saying "stop" is an operator
    /// decision, not an exhausted budget.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use resurge::{Retry, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// #[derive(Debug, PartialEq)]
    /// enum AppError { Transient, Permanent }
    ///
    /// let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(5);
    ///
    /// let err = Retry::new(policy)
    ///     .retry_if(|e| matches!(e, AppError::Transient))
    ///     .run(|| async { Err::<(), _>(AppError::Permanent) })
    ///     .await
    ///     .unwrap_err();
    ///
    /// assert!(err.is_condition_rejected());
    /// assert_eq!(err.history().len(), 1);
    /// # });
    /// ```
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Box::new(predicate));
        self
    }

    /// Observe failed attempts.
    ///
    /// The hook receives the error and the 1-based attempt number after
    /// every failed primary attempt, including the last. It is a
    /// notification side channel: it returns `()` and therefore cannot
    /// alter the retry control flow. Keep it cheap; it runs synchronously
    /// inside the loop.
    pub fn on_retry<H>(mut self, hook: H) -> Self
    where
        H: Fn(&E, u32) + Send + Sync + 'static,
    {
        self.on_retry = Some(Box::new(hook));
        self
    }

    /// Append an alternate operation to the fallback chain.
    ///
    /// Fallbacks run only after the primary attempt budget is exhausted,
    /// each exactly once, in the order they were added. Call this multiple
    /// times to build an ordered chain.
    pub fn fallback<F, Fut>(mut self, fallback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.fallbacks.push(Box::new(move || Box::pin(fallback())));
        self
    }

    /// Attach a cancellation token.
    ///
    /// The token is checked before the first attempt, after every failed
    /// attempt, before each fallback, and continuously during inter-attempt
    /// delays; a delay in progress is interrupted rather than allowed to
    /// elapse. Cancellation takes precedence over every other termination
    /// at the point it is observed.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Seed the jitter random source for deterministic delays.
    ///
    /// Intended for tests: two runs with the same seed, policy, and failure
    /// pattern sleep for identical durations.
    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Drive the operation to a terminal outcome.
    ///
    /// The operation is a factory invoked once per attempt, so each attempt
    /// starts from scratch (fresh connection, new request id, and so on).
    /// Success returns a [`RetryResult`]; otherwise the classified
    /// [`RetryError`] carries the attempt count and the complete error
    /// history, fallback failures included.
    pub async fn run<F, Fut>(mut self, mut operation: F) -> Result<RetryResult<T, E>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let gate = AbortGate::new(self.cancel.take());
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let start = Instant::now();
        let max_attempts = self.policy.max_attempts();
        let mut history = ErrorHistory::new();
        let mut previous_delay = self.policy.initial_delay();

        if gate.is_cancelled() {
            return Err(RetryError::Aborted {
                attempts: 0,
                history,
            });
        }

        for attempt in 1..=max_attempts {
            match operation().await {
                Ok(value) => {
                    return Ok(RetryResult {
                        value,
                        attempts: attempt,
                        total_elapsed: start.elapsed(),
                        errors: history,
                    });
                }
                Err(error) => history.push(error),
            }

            if gate.is_cancelled() {
                return Err(RetryError::Aborted {
                    attempts: attempt,
                    history,
                });
            }

            if let (Some(hook), Some(error)) = (&self.on_retry, history.last()) {
                hook(error, attempt);
            }

            if attempt == max_attempts {
                break;
            }

            if let (Some(predicate), Some(error)) = (&self.retry_if, history.last()) {
                if !predicate(error) {
                    return Err(RetryError::ConditionRejected {
                        attempts: attempt,
                        history,
                    });
                }
            }

            let delay = compute_delay(&self.policy, attempt, previous_delay, &mut rng);
            previous_delay = delay;

            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "attempt failed, backing off");

            if gate.sleep(delay).await == SleepOutcome::Interrupted {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt, "delay interrupted by cancellation");

                return Err(RetryError::Aborted {
                    attempts: attempt,
                    history,
                });
            }
        }

        if self.fallbacks.is_empty() {
            return Err(RetryError::MaxAttemptsExceeded {
                attempts: max_attempts,
                history,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            fallbacks = self.fallbacks.len(),
            "attempt budget exhausted, trying fallbacks"
        );

        for fallback in &self.fallbacks {
            if gate.is_cancelled() {
                return Err(RetryError::Aborted {
                    attempts: max_attempts,
                    history,
                });
            }

            match fallback().await {
                Ok(value) => {
                    return Ok(RetryResult {
                        value,
                        attempts: max_attempts,
                        total_elapsed: start.elapsed(),
                        errors: history,
                    });
                }
                Err(error) => history.push(error),
            }
        }

        Err(RetryError::FallbackExhausted {
            attempts: max_attempts,
            history,
        })
    }
}

impl<T, E> Default for Retry<T, E> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<T, E> fmt::Debug for Retry<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("policy", &self.policy)
            .field("retry_if", &self.retry_if.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .field("fallbacks", &self.fallbacks.len())
            .field("cancel", &self.cancel.is_some())
            .field("seed", &self.seed)
            .finish()
    }
}

/// Retry an operation with a policy and no hooks.
///
/// Convenience over [`Retry::new`] for the common case.
///
/// # Examples
///
/// ```rust
/// use resurge::{retry, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::fixed(Duration::from_millis(1));
///
/// let result = retry(policy, || async { Ok::<_, String>(42) }).await.unwrap();
///
/// assert_eq!(result.value, 42);
/// assert_eq!(result.attempts, 1);
/// assert!(result.errors.is_empty());
/// # });
/// ```
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    operation: F,
) -> Result<RetryResult<T, E>, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Retry::new(policy).run(operation).await
}

#[cfg(test)]
mod engine_tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(1))
            .with_max_attempts(max_attempts)
            .without_jitter()
    }

    #[tokio::test]
    async fn test_success_on_first_call() {
        let result = retry(quick_policy(3), || async { Ok::<_, String>("done") })
            .await
            .unwrap();

        assert_eq!(result.value, "done");
        assert_eq!(result.attempts, 1);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_failures_accumulate_in_order() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry(quick_policy(4), || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("failure {}", n))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.attempts, 3);
        assert_eq!(
            result.errors.as_slice(),
            &["failure 1".to_string(), "failure 2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_without_fallback() {
        let err = retry(quick_policy(3), || async { Err::<(), _>("always") })
            .await
            .unwrap_err();

        assert!(err.is_max_attempts_exceeded());
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.history().len(), 3);
    }

    #[tokio::test]
    async fn test_last_attempt_skips_predicate() {
        // A predicate that rejects everything must still let the final
        // attempt's failure classify as exhaustion, not rejection.
        let err = Retry::new(quick_policy(1))
            .retry_if(|_: &&str| false)
            .run(|| async { Err::<(), _>("boom") })
            .await
            .unwrap_err();

        assert!(err.is_max_attempts_exceeded());
    }

    #[tokio::test]
    async fn test_on_retry_sees_every_failed_attempt() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let _ = Retry::new(quick_policy(3))
            .on_retry({
                let seen = seen.clone();
                move |error: &&str, attempt| {
                    seen.lock().unwrap().push((attempt, *error));
                }
            })
            .run(|| async { Err::<(), _>("boom") })
            .await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, "boom"), (2, "boom"), (3, "boom")]
        );
    }

    #[tokio::test]
    async fn test_fallback_value_reports_primary_budget() {
        let err_then_ok = Retry::new(quick_policy(2))
            .fallback(|| async { Ok::<_, String>(99) })
            .run(|| async { Err::<i32, _>("primary down".to_string()) })
            .await
            .unwrap();

        assert_eq!(err_then_ok.value, 99);
        assert_eq!(err_then_ok.attempts, 2);
        assert_eq!(err_then_ok.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_retry_builder_debug_is_summary() {
        let builder: Retry<i32, String> = Retry::new(quick_policy(2))
            .retry_if(|_| true)
            .fallback(|| async { Ok(1) });

        let rendered = format!("{:?}", builder);
        assert!(rendered.contains("Retry"));
        assert!(rendered.contains("fallbacks: 1"));
    }

    #[cfg(feature = "tracing")]
    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_backoff_decisions_are_traced() {
        let _ = retry(quick_policy(2), || async { Err::<(), _>("boom") }).await;

        assert!(logs_contain("backing off"));
    }

    #[tokio::test]
    async fn test_seeded_runs_take_identical_time_shapes() {
        // Two seeded runs compute the same jittered delays; with full
        // jitter and unequal seeds they would almost surely differ.
        let policy = RetryPolicy::exponential(Duration::from_millis(1))
            .with_max_attempts(3)
            .with_full_jitter();

        let run = |seed| {
            let policy = policy.clone();
            async move {
                let started = Instant::now();
                let _ = Retry::new(policy)
                    .with_jitter_seed(seed)
                    .run(|| async { Err::<(), _>("x") })
                    .await;
                started.elapsed()
            }
        };

        let a = run(7).await;
        let b = run(7).await;

        // Coarse bound: identical schedules land well within a few ms of
        // each other even under scheduler noise.
        let diff = a.abs_diff(b);
        assert!(diff < Duration::from_millis(20), "diff was {:?}", diff);
    }
}
