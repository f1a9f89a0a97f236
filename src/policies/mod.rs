//! Retry policies shared across the controller's components.
//!
//! The permission negotiator, the stream starter and the initial discovery
//! loop all poll an unreliable plugin; this module centralizes their knobs so
//! every "try N times, waiting between attempts" loop is driven by the same
//! value objects instead of ad hoc sleep constants.
//!
//! ## Contents
//! - [`RetryPolicy`] how many attempts, and the delay schedule between them
//! - [`BackoffPolicy`] how delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`] randomization strategy for delays
//!
//! ## Defaults
//! The crate's defaults reproduce the observed device timings:
//! permission polling is 6 attempts at a constant 3 s, device opening is
//! 3 attempts with 1 s then 2 s gaps, initial discovery is 10 attempts at 1 s.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
