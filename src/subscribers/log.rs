//! # Built-in logging subscriber.
//!
//! [`LogWriter`] forwards lifecycle events to the `tracing` ecosystem in a
//! compact form. Useful as-is for development; production embedders will
//! typically implement their own [`Subscribe`] for metrics or UI plumbing.
//!
//! ## Output shape
//! ```text
//! slot activated device=camA slot=0 1280x720
//! slot deactivated slot=0 reason=device removed
//! close completed device=camA
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Forwards every event to `tracing` at info/warn level.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let device = e.device.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::DeviceAttached => info!(device, "device attached"),
            EventKind::DeviceDetached => info!(device, "device detached"),
            EventKind::PermissionRequested => info!(device, "permission requested"),
            EventKind::PermissionGranted => {
                info!(device, attempt = e.attempt, "permission granted")
            }
            EventKind::SlotActivated => info!(
                device,
                slot = e.slot,
                width = e.width,
                height = e.height,
                "slot activated"
            ),
            EventKind::SlotDeactivated => info!(
                device,
                slot = e.slot,
                reason = e.reason.as_deref(),
                "slot deactivated"
            ),
            EventKind::SetupFailed => warn!(
                device,
                slot = e.slot,
                reason = e.reason.as_deref(),
                "setup failed"
            ),
            EventKind::StreamDisconnected => {
                info!(device, slot = e.slot, "stream disconnected")
            }
            EventKind::CloseQueued => info!(device, slot = e.slot, "close queued"),
            EventKind::CloseCompleted => info!(device, "close completed"),
            EventKind::CloseFailed => {
                warn!(device, reason = e.reason.as_deref(), "close failed")
            }
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllClosedWithin => info!("all closes drained within grace"),
            EventKind::GraceExceeded => warn!("shutdown grace exceeded"),
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
