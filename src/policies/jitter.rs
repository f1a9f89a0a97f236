//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that several slots
//! retrying against the same bus (e.g. two cameras re-opened after a hub
//! reset) do not hammer the plugin in lockstep.
//!
//! - [`JitterPolicy::None`] — no randomization, predictable delays (default;
//!   the device timings in this crate are deterministic by default)
//! - [`JitterPolicy::Full`] — random delay in `[0, delay]`
//! - [`JitterPolicy::Equal`] — `delay/2 + random[0, delay/2]`

use rand::Rng;
use std::time::Duration;

/// Randomization strategy for retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay.
    #[default]
    None,

    /// Full jitter: random delay in `[0, delay]`.
    ///
    /// Maximum load spreading; can significantly shorten a delay.
    Full,

    /// Equal jitter: `delay/2 + random[0, delay/2]`.
    ///
    /// Preserves ~75% of the original delay on average.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => self.full_jitter(delay),
            JitterPolicy::Equal => self.equal_jitter(delay),
        }
    }

    /// Full jitter: random[0, delay]
    fn full_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::rng();
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.random_range(0..=ms))
    }

    /// Equal jitter: delay/2 + random[0, delay/2]
    fn equal_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::rng();
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        let half = ms / 2;
        let jitter = if half == 0 {
            0
        } else {
            rng.random_range(0..=half)
        };
        Duration::from_millis(half + jitter)
    }
}
