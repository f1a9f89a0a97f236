//! # Subscriber trait.

use async_trait::async_trait;

use crate::events::Event;

/// # Receives runtime events.
///
/// Each subscriber gets its own bounded queue and worker task; `on_event` is
/// awaited by that worker only, never by the publisher. Implementations
/// should be quick — an overflowing queue drops events for that subscriber.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Stable subscriber name, used in overflow/panic diagnostics.
    fn name(&self) -> &'static str;

    /// Capacity of this subscriber's queue (clamped to ≥ 1).
    fn queue_capacity(&self) -> usize {
        256
    }
}
