//! Pure delay calculation: backoff growth plus jitter.
//!
//! This module is the arithmetic heart of the engine and performs no I/O.
//! Randomness is injected as a [`rand::Rng`] parameter rather than drawn from
//! a hidden global, so callers (and tests) can fix the random source and get
//! identical output for identical input.

use std::time::Duration;

use rand::Rng;

use crate::policy::{JitterStrategy, RetryPolicy};

/// Compute the delay to wait after a failed attempt (1-based).
///
/// The base delay follows the policy's backoff strategy, clamped to the
/// policy's `max_delay` before jitter. Jitter then randomizes the base
/// according to the policy's jitter strategy; `previous_delay` feeds the
/// decorrelated formula only and is otherwise ignored. The result always
/// lies in `[0, max_delay]`.
///
/// # Examples
///
/// ```rust
/// use resurge::delay::compute_delay;
/// use resurge::RetryPolicy;
/// use rand::SeedableRng;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(1000))
///     .with_max_delay(Duration::from_millis(20_000))
///     .without_jitter();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
///
/// let delay = compute_delay(&policy, 3, policy.initial_delay(), &mut rng);
/// assert_eq!(delay, Duration::from_millis(4000));
/// ```
pub fn compute_delay<R>(
    policy: &RetryPolicy,
    attempt: u32,
    previous_delay: Duration,
    rng: &mut R,
) -> Duration
where
    R: Rng + ?Sized,
{
    let base = policy.base_delay(attempt);
    apply_jitter(
        policy.jitter(),
        base,
        previous_delay,
        policy.initial_delay(),
        policy.max_delay(),
        rng,
    )
}

/// Apply a jitter strategy to a pre-clamped base delay.
fn apply_jitter<R>(
    strategy: JitterStrategy,
    base: Duration,
    previous_delay: Duration,
    initial_delay: Duration,
    max_delay: Duration,
    rng: &mut R,
) -> Duration
where
    R: Rng + ?Sized,
{
    match strategy {
        JitterStrategy::None => base,

        JitterStrategy::Full => {
            // Uniform in [0, base).
            base.mul_f64(rng.random::<f64>()).min(max_delay)
        }

        JitterStrategy::Equal => {
            // Half fixed, half uniform: base/2 + U(0, base/2).
            let half = base / 2;
            (half + half.mul_f64(rng.random::<f64>())).min(max_delay)
        }

        JitterStrategy::Decorrelated => {
            // Range is [base, min(3 * previous, max_delay)]; base arrives
            // already clamped to max_delay.
            let lower = base;
            let upper = previous_delay.saturating_mul(3).min(max_delay);
            if upper <= lower {
                return lower;
            }
            let sampled = lower + (upper - lower).mul_f64(rng.random::<f64>());
            sampled.max(initial_delay).min(max_delay)
        }
    }
}
