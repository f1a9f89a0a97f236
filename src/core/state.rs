//! # Runtime-adjustable controller state.

use std::time::Duration;

/// Mutable controller flags, behind one lock so related reads are coherent.
pub(crate) struct ControllerState {
    /// True between a successful `start()` and `stop()`.
    pub initialized: bool,
    /// True once the initial discovery-and-setup pass has finished; the
    /// auto-management tick stays dormant until then.
    pub first_setup_done: bool,
    /// Whether the auto-management tick is enabled.
    pub auto_detect: bool,
    /// Auto-management tick interval (already user-set; clamped on read).
    pub detection_interval: Duration,
}

impl ControllerState {
    pub fn new(auto_detect: bool, detection_interval: Duration) -> Self {
        Self {
            initialized: false,
            first_setup_done: false,
            auto_detect,
            detection_interval,
        }
    }
}
