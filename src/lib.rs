//! # Resurge
//!
//! > *"What recedes, returns"*
//!
//! A Rust library for composable retries: a pure delay core wrapped in a
//! cancellable async shell.
//!
//! ## Philosophy
//!
//! **Resurge** keeps the numeric heart of retrying - backoff growth and
//! jitter - as pure, deterministic functions over a [`RetryPolicy`], and
//! confines the messy parts (clocks, sleeping, cancellation) to a thin
//! engine around them:
//!
//! - **Policies are data**: cloneable, comparable, inspectable; they
//!   describe retry behavior but never execute it.
//! - **Randomness is injected**: jitter draws from a caller-seedable
//!   source, so delay schedules are reproducible in tests.
//! - **Cancellation is cooperative**: a shared token interrupts a delay in
//!   progress instead of letting it run out.
//! - **Nothing is lost**: success and failure alike carry the full
//!   chronological error history, fallback failures included.
//!
//! ## Quick Example
//!
//! ```rust
//! use resurge::{Retry, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::exponential(Duration::from_millis(10))
//!     .with_max_attempts(4);
//!
//! let mut calls = 0u32;
//! let result = Retry::new(policy)
//!     .on_retry(|_, attempt| eprintln!("attempt {attempt} failed"))
//!     .run(|| {
//!         calls += 1;
//!         let n = calls;
//!         async move {
//!             if n < 3 {
//!                 Err("connection reset")
//!             } else {
//!                 Ok("payload")
//!             }
//!         }
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(result.value, "payload");
//! assert_eq!(result.attempts, 3);
//! assert_eq!(result.errors.len(), 2);
//! # });
//! ```
//!
//! ## Fallbacks and Cancellation
//!
//! After the primary attempt budget is exhausted, an ordered chain of
//! alternate operations is tried once each; a cancellation token shared
//! with the caller stops the whole invocation promptly at well-defined
//! checkpoints. See [`Retry`] for the full surface.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod cancel;

pub mod delay;
pub mod engine;
pub mod error;
pub mod policy;
pub mod predicate;

// Re-exports
pub use engine::{retry, Retry, RetryResult};
pub use error::{ErrorHistory, RetryError};
pub use policy::{BackoffStrategy, JitterStrategy, RetryPolicy};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{retry, Retry, RetryResult};
    pub use crate::error::{ErrorHistory, RetryError};
    pub use crate::policy::{BackoffStrategy, JitterStrategy, RetryPolicy};
}
