//! # Render/UI collaborator interface.
//!
//! [`RenderHost`] is the seam to whatever displays decoded frames: the
//! controller hands it raw frame bytes and slot status changes, and asks it
//! to bind or clear per-slot render targets. Displaying pixels, widgets and
//! FPS counters all live on the other side of this trait.

use std::sync::Arc;
use thiserror::Error;

/// Shared handle to a render host.
pub type RenderRef = Arc<dyn RenderHost>;

/// The render host failed to apply a frame to a slot's target.
///
/// Counted against the frame loop's consecutive error budget, like a failed
/// pull.
#[derive(Error, Debug, Clone)]
#[error("render target error: {0}")]
pub struct RenderError(pub String);

/// # Display-side collaborator.
///
/// Methods are synchronous: binding and presenting are expected to be cheap
/// handoffs (texture upload scheduling, channel sends), never blocking work.
pub trait RenderHost: Send + Sync + 'static {
    /// Binds a fresh frame buffer of the given geometry as the slot's render
    /// target.
    ///
    /// Returns `false` when no target exists for this slot — setup then fails
    /// with [`SetupError::NoRenderTarget`](crate::SetupError::NoRenderTarget)
    /// even though the stream already started.
    fn bind(&self, slot: usize, width: u32, height: u32, fps: u32) -> bool;

    /// Applies one raw frame to the slot's bound target.
    fn present(&self, slot: usize, frame: &[u8]) -> Result<(), RenderError>;

    /// Detaches the slot's render target (device vanished or slot vacated).
    fn clear(&self, slot: usize);

    /// Slot status changed; `message` is optional human-readable status text.
    fn status(&self, slot: usize, active: bool, message: Option<&str>);
}
