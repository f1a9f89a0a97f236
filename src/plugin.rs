//! # Device-plugin interface.
//!
//! [`DevicePlugin`] is the narrow seam to the low-level USB camera driver:
//! enumeration, permission, open/start/close, and raw frame pulls. The crate
//! only ever consumes this trait; USB enumeration, the permission dialog and
//! raw capture live behind it.
//!
//! ## Serialization contract
//! The plugin is treated as single-threaded-safe-by-serialization, not
//! concurrency-safe: all calls are made from the controller's long-lived,
//! non-overlapping tasks (watcher, auto-management, per-slot frame loops,
//! close worker). Implementations may assume calls never run truly in
//! parallel.
//!
//! ## Failure contract
//! Every call may fail. Callers catch each failure at the call site, log it,
//! and apply their own retry policy; no plugin failure ever crosses a task
//! boundary.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::PluginError;

/// Shared handle to a device plugin.
pub type PluginRef = Arc<dyn DevicePlugin>;

/// A (resolution, frame rate, pixel format) tuple plus transport knobs,
/// as passed to [`DevicePlugin::start`].
///
/// One `StreamFormat` per rung of the start ladder; the first rung the plugin
/// accepts (zero return code) wins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Requested frame rate.
    pub fps: u32,
    /// Plugin-specific pixel format code.
    pub pixel_format: u32,
    /// Fraction of isochronous bandwidth to claim, in `(0, 1]`.
    pub bandwidth: f32,
}

impl StreamFormat {
    /// Returns the same format at a different resolution.
    pub fn at(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..*self
        }
    }
}

impl Default for StreamFormat {
    /// Default capture target: 1280×720 at 30 fps, format code 9,
    /// 30% bandwidth claim.
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            pixel_format: 9,
            bandwidth: 0.3,
        }
    }
}

/// # Narrow interface to the USB camera driver.
///
/// All methods are async so implementations can hop to a driver thread or an
/// FFI executor without blocking the controller's scheduler.
#[async_trait]
pub trait DevicePlugin: Send + Sync + 'static {
    /// Enumerates the identifiers of currently attached devices.
    async fn list_devices(&self) -> Result<Vec<String>, PluginError>;

    /// Asks the host to grant access to `device` (may pop a dialog).
    ///
    /// Fire-and-forget from the caller's perspective; the grant is observed
    /// later via [`has_permission`](DevicePlugin::has_permission).
    async fn request_permission(&self, device: &str) -> Result<(), PluginError>;

    /// Reports whether access to `device` is currently granted.
    async fn has_permission(&self, device: &str) -> Result<bool, PluginError>;

    /// Fetches a descriptive info string for `device` (best-effort).
    async fn device_info(&self, device: &str) -> Result<String, PluginError>;

    /// Opens `device` and returns its supported-format descriptors.
    ///
    /// An empty vector counts as a failed open.
    async fn open(&self, device: &str) -> Result<Vec<String>, PluginError>;

    /// Starts streaming `device` with the given format.
    ///
    /// Returns the plugin's result code; `0` means the stream is running.
    async fn start(&self, device: &str, format: &StreamFormat) -> Result<i32, PluginError>;

    /// Pulls one raw frame from `device`.
    ///
    /// An empty buffer is a valid return and counts as a failed pull for the
    /// frame loop's error budget.
    async fn pull_frame(&self, device: &str) -> Result<Vec<u8>, PluginError>;

    /// Closes `device`, releasing its handle. Returns the plugin's result code.
    async fn close(&self, device: &str) -> Result<i32, PluginError>;
}
