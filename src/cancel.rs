//! Cancellation bridging between a caller-held token and the retry loop.
//!
//! The engine never owns cancellation state; it observes a
//! [`CancellationToken`] the caller may share and trigger from anywhere.
//! This module adapts that token into the two shapes the loop needs: a
//! point-in-time check and a sleep that can be interrupted.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// How a cancellable sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SleepOutcome {
    /// The full duration elapsed.
    Elapsed,
    /// Cancellation fired before the duration elapsed.
    Interrupted,
}

/// Adapter over an optional cancellation token.
///
/// With no token, `is_cancelled` is always false and `sleep` is a plain
/// timer.
#[derive(Debug, Clone, Default)]
pub(crate) struct AbortGate {
    token: Option<CancellationToken>,
}

impl AbortGate {
    pub(crate) fn new(token: Option<CancellationToken>) -> Self {
        Self { token }
    }

    /// Point-in-time cancellation check; never suspends.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Sleep for `duration`, waking early if the token cancels.
    ///
    /// An already-cancelled token resolves as interrupted without a timer
    /// ever being scheduled. Both the timer and the cancellation listener
    /// are futures local to this call, so whichever loses the race is
    /// dropped before the call returns; nothing outlives the sleep.
    pub(crate) async fn sleep(&self, duration: Duration) -> SleepOutcome {
        let Some(token) = &self.token else {
            tokio::time::sleep(duration).await;
            return SleepOutcome::Elapsed;
        };

        if token.is_cancelled() {
            return SleepOutcome::Interrupted;
        }
        if duration.is_zero() {
            return SleepOutcome::Elapsed;
        }

        tokio::select! {
            _ = token.cancelled() => SleepOutcome::Interrupted,
            _ = tokio::time::sleep(duration) => SleepOutcome::Elapsed,
        }
    }
}

#[cfg(test)]
mod cancel_tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_no_token_never_cancelled() {
        let gate = AbortGate::new(None);

        assert!(!gate.is_cancelled());
        assert_eq!(gate.sleep(Duration::from_millis(1)).await, SleepOutcome::Elapsed);
    }

    #[tokio::test]
    async fn test_sleep_elapses_without_cancellation() {
        let gate = AbortGate::new(Some(CancellationToken::new()));

        let start = Instant::now();
        let outcome = gate.sleep(Duration::from_millis(20)).await;

        assert_eq!(outcome, SleepOutcome::Elapsed);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_already_cancelled_resolves_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let gate = AbortGate::new(Some(token));

        assert!(gate.is_cancelled());

        let start = Instant::now();
        let outcome = gate.sleep(Duration::from_secs(60)).await;

        assert_eq!(outcome, SleepOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_sleep_promptly() {
        let token = CancellationToken::new();
        let gate = AbortGate::new(Some(token.clone()));

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let start = Instant::now();
        let outcome = gate.sleep(Duration::from_secs(60)).await;

        assert_eq!(outcome, SleepOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_secs(1));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_duration_sleep_returns_elapsed() {
        let gate = AbortGate::new(Some(CancellationToken::new()));

        assert_eq!(gate.sleep(Duration::ZERO).await, SleepOutcome::Elapsed);
    }
}
