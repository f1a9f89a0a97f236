//! # Retry policy: attempt count plus delay schedule.
//!
//! [`RetryPolicy`] bundles the number of attempts a polling loop makes with
//! the [`BackoffPolicy`] that spaces them. The permission negotiator, stream
//! starter and initial discovery each carry one, so their timing is a value
//! that tests can replace wholesale.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// How many attempts to make, and how long to wait between them.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total number of attempts (at least 1).
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// A fixed schedule: `max_attempts` attempts spaced by a constant `interval`.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffPolicy::constant(interval),
        }
    }

    /// A growing schedule: `max_attempts` attempts, delays starting at
    /// `first` and multiplying by `factor`, capped at `max`.
    pub fn growing(max_attempts: u32, first: Duration, factor: f64, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffPolicy::growing(first, factor, max),
        }
    }

    /// Returns the delay to wait after the given 0-indexed failed attempt,
    /// or `None` when no further attempt will follow.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            None
        } else {
            Some(self.backoff.next(attempt))
        }
    }
}
