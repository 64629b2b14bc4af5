//! Retry policy types and configuration.

use std::time::Duration;

/// A retry policy describing how failed operations are re-attempted.
///
/// Policies are pure data - they describe retry behavior but don't execute it.
/// This makes them easy to test, clone, and inspect. Predicates, hooks,
/// fallbacks, and cancellation are wired up on [`Retry`](crate::Retry), which
/// consumes a policy.
///
/// A policy is built by layering overrides onto defaults:
///
/// - `max_attempts`: 3
/// - `initial_delay`: 1000 ms
/// - `max_delay`: 30 000 ms
/// - backoff: [`BackoffStrategy::Exponential`]
/// - jitter: [`JitterStrategy::Full`]
///
/// # Examples
///
/// ```rust
/// use resurge::RetryPolicy;
/// use std::time::Duration;
///
/// // Exponential backoff, five attempts, capped at 10s per delay
/// let policy = RetryPolicy::exponential(Duration::from_millis(100))
///     .with_max_attempts(5)
///     .with_max_delay(Duration::from_secs(10));
///
/// assert_eq!(policy.max_attempts(), 5);
///
/// // Fixed delay with the default attempt budget
/// let policy = RetryPolicy::fixed(Duration::from_millis(500));
/// assert_eq!(policy.max_attempts(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff: BackoffStrategy,
    jitter: JitterStrategy,
}

/// The growth law for pre-jitter delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// Every delay equals the initial delay.
    Fixed,
    /// Delay grows linearly: `initial * attempt`.
    Linear,
    /// Delay doubles: `initial * 2^(attempt - 1)`.
    #[default]
    Exponential,
    /// Faster-growing exponent: `initial * 3^(attempt - 1)`.
    Aggressive,
}

/// The randomization law applied to a base delay.
///
/// Jitter spreads retries from independent clients apart in time so they do
/// not hammer a recovering service in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterStrategy {
    /// No jitter applied.
    None,
    /// Random delay between 0 and the calculated delay (AWS recommended).
    #[default]
    Full,
    /// Half fixed, half random: `base/2 + random(base/2)`.
    Equal,
    /// Decorrelated jitter (AWS style): the range depends on the previous
    /// delay rather than only the current base delay.
    Decorrelated,
}

impl RetryPolicy {
    fn with_backoff(initial_delay: Duration, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: 3,
            initial_delay,
            max_delay: Duration::from_millis(30_000),
            backoff,
            jitter: JitterStrategy::default(),
        }
    }

    /// Create a policy with a fixed delay between attempts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use resurge::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::fixed(Duration::from_millis(500));
    ///
    /// // Every attempt waits 500ms (pre-jitter)
    /// assert_eq!(policy.base_delay(1), Duration::from_millis(500));
    /// assert_eq!(policy.base_delay(4), Duration::from_millis(500));
    /// ```
    pub fn fixed(initial_delay: Duration) -> Self {
        Self::with_backoff(initial_delay, BackoffStrategy::Fixed)
    }

    /// Create a policy with linearly increasing delay.
    ///
    /// Delay = `initial * attempt`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use resurge::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::linear(Duration::from_millis(100));
    ///
    /// assert_eq!(policy.base_delay(1), Duration::from_millis(100));
    /// assert_eq!(policy.base_delay(2), Duration::from_millis(200));
    /// assert_eq!(policy.base_delay(3), Duration::from_millis(300));
    /// ```
    pub fn linear(initial_delay: Duration) -> Self {
        Self::with_backoff(initial_delay, BackoffStrategy::Linear)
    }

    /// Create a policy with exponentially increasing delay.
    ///
    /// Delay = `initial * 2^(attempt - 1)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use resurge::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_millis(100));
    ///
    /// assert_eq!(policy.base_delay(1), Duration::from_millis(100));
    /// assert_eq!(policy.base_delay(2), Duration::from_millis(200));
    /// assert_eq!(policy.base_delay(3), Duration::from_millis(400));
    /// ```
    pub fn exponential(initial_delay: Duration) -> Self {
        Self::with_backoff(initial_delay, BackoffStrategy::Exponential)
    }

    /// Create a policy with an aggressive, base-3 exponent.
    ///
    /// Delay = `initial * 3^(attempt - 1)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use resurge::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::aggressive(Duration::from_millis(100));
    ///
    /// assert_eq!(policy.base_delay(1), Duration::from_millis(100));
    /// assert_eq!(policy.base_delay(2), Duration::from_millis(300));
    /// assert_eq!(policy.base_delay(3), Duration::from_millis(900));
    /// ```
    pub fn aggressive(initial_delay: Duration) -> Self {
        Self::with_backoff(initial_delay, BackoffStrategy::Aggressive)
    }

    /// Set the upper bound on primary invocations.
    ///
    /// This counts the initial attempt: `with_max_attempts(3)` means up to 3
    /// total calls of the primary operation.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero. An attempt budget of zero is a configuration
    /// error, caught here at construction rather than mid-run.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use resurge::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_millis(100))
    ///     .with_max_attempts(5);
    ///
    /// assert_eq!(policy.max_attempts(), 5);
    /// ```
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        assert!(n >= 1, "max_attempts must be at least 1");
        self.max_attempts = n;
        self
    }

    /// Set the hard ceiling on any computed delay.
    ///
    /// Delays never exceed this value, regardless of the backoff strategy's
    /// growth or the jitter strategy's spread.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use resurge::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_secs(1))
    ///     .with_max_delay(Duration::from_secs(20));
    ///
    /// // Without the cap attempt 6 would be 32s
    /// assert_eq!(policy.base_delay(6), Duration::from_secs(20));
    /// ```
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    /// Disable jitter: delays follow the backoff formula exactly.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::None;
        self
    }

    /// Use full jitter (AWS recommended, the default).
    ///
    /// The delay is a random value between 0 and the calculated delay. This
    /// provides maximum spread to prevent thundering herd.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Use equal jitter: half the delay is fixed, half randomized.
    pub fn with_equal_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Equal;
        self
    }

    /// Use decorrelated jitter (AWS style).
    ///
    /// Each delay is drawn from a range that depends on the previous delay,
    /// which reduces correlation across consecutive retries while
    /// maintaining progression.
    pub fn with_decorrelated_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Decorrelated;
        self
    }

    /// Get the attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Get the delay basis for attempt 1, pre-jitter.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Get the hard delay ceiling.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Get the backoff strategy.
    pub fn backoff(&self) -> BackoffStrategy {
        self.backoff
    }

    /// Get the jitter strategy.
    pub fn jitter(&self) -> JitterStrategy {
        self.jitter
    }

    /// Calculate the pre-jitter delay for an attempt (1-based).
    ///
    /// An attempt below 1 is treated as attempt 1, so attempt 1 always yields
    /// the initial delay. The result is clamped to `max_delay`; arithmetic
    /// saturates rather than overflowing for large attempt counts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use resurge::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_millis(1000))
    ///     .with_max_delay(Duration::from_millis(20_000));
    ///
    /// assert_eq!(policy.base_delay(3), Duration::from_millis(4000));
    /// assert_eq!(policy.base_delay(9), Duration::from_millis(20_000)); // capped
    /// ```
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);

        let base = match self.backoff {
            BackoffStrategy::Fixed => self.initial_delay,
            BackoffStrategy::Linear => self.initial_delay.saturating_mul(attempt),
            BackoffStrategy::Exponential => self
                .initial_delay
                .saturating_mul(2u32.saturating_pow(attempt - 1)),
            BackoffStrategy::Aggressive => self
                .initial_delay
                .saturating_mul(3u32.saturating_pow(attempt - 1)),
        };

        base.min(self.max_delay)
    }

    /// Validate the policy.
    ///
    /// Every policy reachable through the constructors is valid; this exists
    /// for policies deserialized or assembled from external configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_attempts == 0 {
            Err("max_attempts must be at least 1")
        } else {
            Ok(())
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_backoff(Duration::from_millis(1000), BackoffStrategy::default())
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    //! Serde support for policy types (feature-gated).
    //!
    //! Policies serialize as flat configuration: delays in integer
    //! milliseconds, strategies as lowercase strings. Deserialization
    //! merges the supplied fields onto the defaults and validates, so a
    //! zero attempt budget or an unrecognized strategy name fails at
    //! construction instead of surfacing mid-run.

    use std::fmt;
    use std::time::Duration;

    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeStruct;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{BackoffStrategy, JitterStrategy, RetryPolicy};

    const BACKOFF_VARIANTS: &[&str] = &["fixed", "linear", "exponential", "aggressive"];
    const JITTER_VARIANTS: &[&str] = &["none", "full", "equal", "decorrelated"];
    const POLICY_FIELDS: &[&str] = &[
        "max_attempts",
        "initial_delay_ms",
        "max_delay_ms",
        "backoff",
        "jitter",
    ];

    impl Serialize for BackoffStrategy {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let name = match self {
                BackoffStrategy::Fixed => "fixed",
                BackoffStrategy::Linear => "linear",
                BackoffStrategy::Exponential => "exponential",
                BackoffStrategy::Aggressive => "aggressive",
            };
            serializer.serialize_str(name)
        }
    }

    impl<'de> Deserialize<'de> for BackoffStrategy {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct BackoffVisitor;

            impl Visitor<'_> for BackoffVisitor {
                type Value = BackoffStrategy;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("one of `fixed`, `linear`, `exponential`, `aggressive`")
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                    match v {
                        "fixed" => Ok(BackoffStrategy::Fixed),
                        "linear" => Ok(BackoffStrategy::Linear),
                        "exponential" => Ok(BackoffStrategy::Exponential),
                        "aggressive" => Ok(BackoffStrategy::Aggressive),
                        other => Err(de::Error::unknown_variant(other, BACKOFF_VARIANTS)),
                    }
                }
            }

            deserializer.deserialize_str(BackoffVisitor)
        }
    }

    impl Serialize for JitterStrategy {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let name = match self {
                JitterStrategy::None => "none",
                JitterStrategy::Full => "full",
                JitterStrategy::Equal => "equal",
                JitterStrategy::Decorrelated => "decorrelated",
            };
            serializer.serialize_str(name)
        }
    }

    impl<'de> Deserialize<'de> for JitterStrategy {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct JitterVisitor;

            impl Visitor<'_> for JitterVisitor {
                type Value = JitterStrategy;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("one of `none`, `full`, `equal`, `decorrelated`")
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                    match v {
                        "none" => Ok(JitterStrategy::None),
                        "full" => Ok(JitterStrategy::Full),
                        "equal" => Ok(JitterStrategy::Equal),
                        "decorrelated" => Ok(JitterStrategy::Decorrelated),
                        other => Err(de::Error::unknown_variant(other, JITTER_VARIANTS)),
                    }
                }
            }

            deserializer.deserialize_str(JitterVisitor)
        }
    }

    impl Serialize for RetryPolicy {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut state = serializer.serialize_struct("RetryPolicy", 5)?;
            state.serialize_field("max_attempts", &self.max_attempts)?;
            state.serialize_field("initial_delay_ms", &(self.initial_delay.as_millis() as u64))?;
            state.serialize_field("max_delay_ms", &(self.max_delay.as_millis() as u64))?;
            state.serialize_field("backoff", &self.backoff)?;
            state.serialize_field("jitter", &self.jitter)?;
            state.end()
        }
    }

    impl<'de> Deserialize<'de> for RetryPolicy {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct PolicyVisitor;

            impl<'de> Visitor<'de> for PolicyVisitor {
                type Value = RetryPolicy;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("a retry policy configuration map")
                }

                fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                    // Overrides merge onto the defaults.
                    let mut policy = RetryPolicy::default();

                    while let Some(key) = map.next_key::<String>()? {
                        match key.as_str() {
                            "max_attempts" => policy.max_attempts = map.next_value()?,
                            "initial_delay_ms" => {
                                policy.initial_delay = Duration::from_millis(map.next_value()?);
                            }
                            "max_delay_ms" => {
                                policy.max_delay = Duration::from_millis(map.next_value()?);
                            }
                            "backoff" => policy.backoff = map.next_value()?,
                            "jitter" => policy.jitter = map.next_value()?,
                            other => return Err(de::Error::unknown_field(other, POLICY_FIELDS)),
                        }
                    }

                    policy.validate().map_err(de::Error::custom)?;
                    Ok(policy)
                }
            }

            deserializer.deserialize_struct("RetryPolicy", POLICY_FIELDS, PolicyVisitor)
        }
    }

}
