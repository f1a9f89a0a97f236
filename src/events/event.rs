//! # Lifecycle events emitted by the controller runtime.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Device events**: watcher-observed attach/detach and permission flow
//! - **Slot events**: activation, deactivation, setup failures
//! - **Close events**: close-queue progress
//! - **Shutdown events**: teardown progress
//!
//! The [`Event`] struct carries metadata such as timestamps, device id, slot
//! index and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events are consumed
//! from independent subscriber queues.
//!
//! ## Example
//! ```rust
//! use campool::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::SetupFailed)
//!     .with_device("camA")
//!     .with_slot(0)
//!     .with_reason("setup_open_failed");
//!
//! assert_eq!(ev.kind, EventKind::SetupFailed);
//! assert_eq!(ev.device.as_deref(), Some("camA"));
//! assert_eq!(ev.slot, Some(0));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Device events ===
    /// Watcher observed a device absent from the previous tick.
    ///
    /// Sets: `device`, `at`, `seq`
    DeviceAttached,

    /// Watcher observed a device missing from the current tick.
    ///
    /// Sets: `device`, `at`, `seq`
    DeviceDetached,

    /// A permission request was issued for a device.
    ///
    /// Sets: `device`, `at`, `seq`
    PermissionRequested,

    /// A permission poll reported the device granted.
    ///
    /// Sets: `device`, `attempt` (poll number), `at`, `seq`
    PermissionGranted,

    // === Slot events ===
    /// A slot's stream started and its frame loop launched.
    ///
    /// Sets: `device`, `slot`, `width`, `height`, `at`, `seq`
    SlotActivated,

    /// A slot was vacated (device vanished, error budget exhausted, stop or
    /// swap).
    ///
    /// Sets: `device` (when still known), `slot`, `reason`, `at`, `seq`
    SlotDeactivated,

    /// A setup attempt for a claimed slot failed; the slot was cleared back
    /// to empty.
    ///
    /// Sets: `device`, `slot`, `reason` (error label), `at`, `seq`
    SetupFailed,

    /// A frame loop observed its device missing mid-stream.
    ///
    /// Sets: `device`, `slot`, `at`, `seq`
    StreamDisconnected,

    // === Close events ===
    /// A close request was enqueued for a vacated device.
    ///
    /// Sets: `device`, `slot`, `at`, `seq`
    CloseQueued,

    /// The close worker finished a close call.
    ///
    /// Sets: `device`, `at`, `seq`
    CloseCompleted,

    /// The close worker's close call failed (logged, never propagated).
    ///
    /// Sets: `device`, `reason`, `at`, `seq`
    CloseFailed,

    // === Shutdown events ===
    /// Teardown began (explicit `stop()` or OS signal).
    ///
    /// Sets: `at`, `seq`
    ShutdownRequested,

    /// All pending closes drained within the configured grace period.
    ///
    /// Sets: `at`, `seq`
    AllClosedWithin,

    /// Grace period exceeded with closes still pending.
    ///
    /// Sets: `at`, `seq`
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Device identifier, if applicable.
    pub device: Option<Arc<str>>,
    /// Slot index, if applicable.
    pub slot: Option<usize>,
    /// Human-readable reason (error labels, status text).
    pub reason: Option<Arc<str>>,
    /// Attempt count (1-based), for permission polls.
    pub attempt: Option<u32>,
    /// Effective frame width, for activations.
    pub width: Option<u32>,
    /// Effective frame height, for activations.
    pub height: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            device: None,
            slot: None,
            reason: None,
            attempt: None,
            width: None,
            height: None,
        }
    }

    /// Attaches a device identifier.
    #[inline]
    pub fn with_device(mut self, device: impl Into<Arc<str>>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Attaches a slot index.
    #[inline]
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches the effective frame geometry.
    #[inline]
    pub fn with_geometry(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}
