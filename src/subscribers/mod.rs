//! Event subscribers: the observability hook for embedding applications.
//!
//! The controller fans every [`Event`](crate::events::Event) out to a set of
//! user-provided subscribers without awaiting them, so a slow metrics sink
//! can never stall a frame loop or a reconciliation pass.
//!
//! ## Contents
//! - [`Subscribe`] trait for receiving events
//! - [`SubscriberSet`] non-blocking fan-out with per-subscriber queues
//! - [`LogWriter`] built-in subscriber that forwards events to `tracing`

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
