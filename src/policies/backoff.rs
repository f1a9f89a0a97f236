//! # Backoff policy for inter-attempt delays.
//!
//! [`BackoffPolicy`] controls how the delay between retry attempts grows.
//! It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for attempt `n` is `first × factor^n`, clamped to `max`, then
//! jitter is applied. The base delay is derived purely from the attempt
//! number, so jitter output never feeds back into subsequent calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use campool::{BackoffPolicy, JitterPolicy};
//!
//! // The device-open schedule: 1s, then 2s between attempts.
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(30),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_secs(1));
//! assert_eq!(backoff.next(1), Duration::from_secs(2));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay schedule between retry attempts.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant 100 ms delay, capped at 30 s, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            jitter: JitterPolicy::None,
            factor: 1.0,
        }
    }
}

impl BackoffPolicy {
    /// A constant schedule: the same `delay` after every attempt.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// A growing schedule starting at `first`, multiplied by `factor` per
    /// attempt, capped at `max`.
    pub fn growing(first: Duration, factor: f64, max: Duration) -> Self {
        Self {
            first,
            max,
            factor,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay for the given attempt number (0-indexed).
    ///
    /// The base delay is `first × factor^attempt`, clamped to
    /// [`BackoffPolicy::max`]; jitter is then applied to the clamped base.
    /// Non-finite or negative intermediate values clamp to `max`.
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let clamped_exp = attempt.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(clamped_exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base)
    }
}
