//! # Per-slot state.
//!
//! A [`Slot`] is one position in the fixed-capacity session pool. Slots are
//! index-addressed and never reordered; the device bound to a slot changes,
//! the slot itself does not move (except for an explicit swap, which moves
//! the bindings, not the slots).

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running per-slot frame loop.
pub(crate) struct FrameTaskHandle {
    /// Join handle for the spawned frame loop.
    pub join: JoinHandle<()>,
    /// Cancels only this slot's frame loop.
    pub cancel: CancellationToken,
}

/// One position in the session pool.
///
/// State machine per slot:
/// - empty: `device_id == None`, `active == false`
/// - claimed: `device_id == Some`, `active == false` (setup in flight, or a
///   frame loop exited and reconciliation has not yet vacated the slot)
/// - active: `device_id == Some`, `active == true`, frame task running
pub(crate) struct Slot {
    /// Bound device identifier, if any.
    pub device_id: Option<String>,
    /// True while the slot's stream is up and its frame loop is running.
    pub active: bool,
    /// Effective frame width of the accepted format.
    pub width: u32,
    /// Effective frame height of the accepted format.
    pub height: u32,
    /// Effective frame rate of the accepted format.
    pub fps: u32,
    /// The slot's frame loop, while one is running.
    pub frame_task: Option<FrameTaskHandle>,
}

impl Slot {
    pub fn new() -> Self {
        Self {
            device_id: None,
            active: false,
            width: 0,
            height: 0,
            fps: 0,
            frame_task: None,
        }
    }
}

/// Point-in-time public snapshot of a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotInfo {
    /// Slot index in the pool.
    pub index: usize,
    /// Bound device identifier, if any.
    pub device_id: Option<String>,
    /// Whether the slot is actively streaming.
    pub active: bool,
    /// Effective frame width (0 while never activated).
    pub width: u32,
    /// Effective frame height (0 while never activated).
    pub height: u32,
    /// Effective frame rate (0 while never activated).
    pub fps: u32,
}
