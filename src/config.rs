//! # Controller configuration.
//!
//! Provides [`Config`], the centralized settings for the session pool. All
//! knobs are settable before [`Controller::start`](crate::Controller::start);
//! the auto-detect flag and detection interval are additionally adjustable at
//! runtime via the controller.
//!
//! ## Floors and sentinels
//! - `detection_interval` is floored at 500 ms (see
//!   [`Config::detection_interval_clamped`]); faster auto-management ticks
//!   churn the plugin for no benefit.
//! - `bus_capacity` is clamped to ≥ 1 by the bus itself.

use std::time::Duration;

use crate::plugin::StreamFormat;
use crate::policies::RetryPolicy;

/// Hard floor for the auto-management tick interval.
pub const MIN_DETECTION_INTERVAL: Duration = Duration::from_millis(500);

/// Global configuration for the session-pool controller.
///
/// Defaults reproduce the reference device timings: capacity 2, a
/// 1280×720@30 target with a defensive primary re-attempt and a 640×480
/// fallback, 6×3 s permission polling, 3 open attempts at 1 s/2 s spacing,
/// and a 10-error frame budget.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of session slots (devices streamed concurrently).
    pub capacity: usize,

    /// Stream-start ladder, tried in order until the plugin accepts one.
    ///
    /// The default repeats the primary format once before falling back:
    /// the repeat tolerates transient start failures and keeps the
    /// observable retry count stable.
    pub ladder: Vec<StreamFormat>,

    /// Live device-monitoring poll interval.
    pub monitor_interval: Duration,

    /// Auto-management tick interval (floored at
    /// [`MIN_DETECTION_INTERVAL`]; runtime-adjustable).
    pub detection_interval: Duration,

    /// Whether the auto-management tick runs at all (runtime-adjustable).
    pub auto_detect: bool,

    /// Delay before the first auto-management tick after start.
    pub auto_detect_delay: Duration,

    /// Initial device discovery at startup.
    pub discovery: RetryPolicy,

    /// Permission polling per setup attempt.
    pub permission: RetryPolicy,

    /// Device-open attempts per setup attempt.
    pub open: RetryPolicy,

    /// Device settle time between permission grant and the first open.
    pub settle: Duration,

    /// Pause after each slot setup during a register pass.
    pub register_settle: Duration,

    /// Pause after each slot vacated during a cleanup pass.
    pub cleanup_spacing: Duration,

    /// Maximum consecutive frame-pull/apply errors before a frame loop
    /// self-terminates.
    pub frame_error_budget: u32,

    /// Frame-loop backoff after a failed or empty pull (below budget).
    pub frame_retry_delay: Duration,

    /// Close-worker debounce before each close call (lets in-flight pulls
    /// against that device drain).
    pub close_debounce: Duration,

    /// Close-worker spacing after each close call.
    pub close_spacing: Duration,

    /// Spacing between close calls on the shutdown drain path (no debounce).
    pub drain_spacing: Duration,

    /// Maximum time to wait for the close queue to drain during shutdown.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the detection interval clamped to its floor.
    #[inline]
    pub fn detection_interval_clamped(&self) -> Duration {
        self.detection_interval.max(MIN_DETECTION_INTERVAL)
    }
}

impl Default for Config {
    fn default() -> Self {
        let target = StreamFormat::default();
        Self {
            capacity: 2,
            ladder: vec![target, target, target.at(640, 480)],
            monitor_interval: Duration::from_millis(300),
            detection_interval: Duration::from_millis(500),
            auto_detect: true,
            auto_detect_delay: Duration::from_secs(3),
            discovery: RetryPolicy::fixed(10, Duration::from_secs(1)),
            permission: RetryPolicy::fixed(6, Duration::from_secs(3)),
            open: RetryPolicy::growing(
                3,
                Duration::from_secs(1),
                2.0,
                Duration::from_secs(30),
            ),
            settle: Duration::from_secs(1),
            register_settle: Duration::from_secs(1),
            cleanup_spacing: Duration::from_millis(100),
            frame_error_budget: 10,
            frame_retry_delay: Duration::from_millis(100),
            close_debounce: Duration::from_millis(300),
            close_spacing: Duration::from_millis(200),
            drain_spacing: Duration::from_millis(100),
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
        }
    }
}
