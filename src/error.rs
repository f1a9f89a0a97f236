//! Error types used by the campool runtime.
//!
//! This module defines the crate's error enums:
//!
//! - [`PluginError`] — a device-plugin call failed (transient, logged, never fatal).
//! - [`SetupError`] — a camera setup attempt failed at a specific stage.
//! - [`RuntimeError`] — errors raised by the controller runtime itself.
//!
//! All types provide `as_label` helpers for logging, mirroring how failures
//! surface: as status text on the affected slot and as log entries. The
//! controller itself never aborts on any of these.

use std::time::Duration;
use thiserror::Error;

/// # A device-plugin call failed.
///
/// Every plugin call may fail; failures are caught at the call site, logged,
/// and handled by the calling component's own retry policy (or the tick is
/// skipped). They are never propagated as a crash.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    /// The underlying plugin call threw or returned an error.
    #[error("plugin call failed: {reason}")]
    Call {
        /// The underlying error message.
        reason: String,
    },

    /// The named device is not available to the plugin.
    #[error("device unavailable: {device}")]
    Unavailable {
        /// Device identifier.
        device: String,
    },
}

impl PluginError {
    /// Shorthand for a generic failed call.
    pub fn call(reason: impl Into<String>) -> Self {
        PluginError::Call {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            PluginError::Call { .. } => "plugin_call_failed",
            PluginError::Unavailable { .. } => "plugin_device_unavailable",
        }
    }
}

/// # A camera setup attempt failed.
///
/// Each variant is terminal for that setup attempt only: the slot's device id
/// is cleared back to empty and the device stays eligible for the next
/// register pass. Mid-stream disconnection is *not* represented here — it is
/// a normal lifecycle transition, not an error.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum SetupError {
    /// Permission polling exhausted without a grant; the device was never opened.
    #[error("permission denied for {device}")]
    PermissionDenied {
        /// Device identifier.
        device: String,
    },

    /// All open attempts threw or returned an empty result.
    #[error("open failed for {device} after {attempts} attempts")]
    OpenFailed {
        /// Device identifier.
        device: String,
        /// Number of open attempts made.
        attempts: u32,
    },

    /// Every rung of the stream-start ladder returned a non-zero code.
    #[error("stream start failed for {device}")]
    StreamStartFailed {
        /// Device identifier.
        device: String,
    },

    /// The stream started but no render target is bound for this slot.
    ///
    /// The just-opened stream must still be released; the controller enqueues
    /// a close request for the device when it sees this variant.
    #[error("no render target bound for slot {slot}")]
    NoRenderTarget {
        /// Slot index.
        slot: usize,
        /// Device whose stream was started and must be torn down.
        device: String,
    },
}

impl SetupError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use campool::SetupError;
    ///
    /// let err = SetupError::PermissionDenied { device: "camA".into() };
    /// assert_eq!(err.as_label(), "setup_permission_denied");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SetupError::PermissionDenied { .. } => "setup_permission_denied",
            SetupError::OpenFailed { .. } => "setup_open_failed",
            SetupError::StreamStartFailed { .. } => "setup_stream_start_failed",
            SetupError::NoRenderTarget { .. } => "setup_no_render_target",
        }
    }
}

/// # Errors produced by the controller runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `start()` was called while the controller is already running.
    #[error("controller already running")]
    AlreadyRunning,

    /// Shutdown grace period was exceeded with device closes still pending.
    #[error("shutdown grace {grace:?} exceeded; pending closes: {pending:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Device ids whose close calls had not completed in time.
        pending: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning => "runtime_already_running",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}
