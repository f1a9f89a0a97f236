//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the watcher, the
//! controller's reconciliation passes, per-slot frame loops and the close
//! worker.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! Frame payloads never travel on the bus — raw bytes go straight to the
//! [`RenderHost`](crate::RenderHost); the bus carries only lifecycle
//! metadata.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
