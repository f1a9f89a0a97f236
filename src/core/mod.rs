//! Runtime core: the device-session lifecycle controller.
//!
//! This module contains the embedded implementation of the session pool. The
//! public API from this module is [`Controller`] (plus its builder and the
//! [`SlotInfo`] snapshot type); everything else is internal.
//!
//! Internal modules:
//! - [`controller`]: slot pool ownership, reconciliation (cleanup/register),
//!   setup orchestration, start/stop lifecycle;
//! - [`slot`]: per-slot state and the frame-task handle;
//! - [`state`]: runtime-adjustable controller flags;
//! - [`watcher`]: periodic device-set diffing;
//! - [`negotiator`]: permission request/poll/re-request protocol;
//! - [`starter`]: device open with retries and the stream-start ladder;
//! - [`frame_loop`]: per-slot pull/present loop with the error budget;
//! - [`closer`]: the serialized close queue and its single worker;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod closer;
mod controller;
mod frame_loop;
mod negotiator;
mod shutdown;
mod slot;
mod starter;
mod state;
mod watcher;

pub use controller::{Controller, ControllerBuilder};
pub use slot::SlotInfo;
