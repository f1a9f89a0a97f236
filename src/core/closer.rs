//! # Serialized close queue.
//!
//! Close calls against the plugin are the one operation that must never
//! overlap: concurrent closes of distinct devices can wedge the driver. All
//! closes therefore funnel through an unbounded FIFO queue consumed by a
//! single worker.
//!
//! The worker has two modes:
//! - normal: debounce before each close (lets in-flight pulls against that
//!   device drain), then the close, then a spacing pause;
//! - drain (after its token is cancelled at shutdown): no debounce, remaining
//!   requests closed back-to-back with a short spacing pause.
//!
//! Requests are enqueued before the worker token is cancelled, so the drain
//! never races a producer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{Bus, Event, EventKind};
use crate::plugin::PluginRef;

/// One queued device close.
pub(crate) struct CloseRequest {
    pub device: String,
    pub slot: usize,
}

/// Producer side of the close queue, shared by the controller's tasks.
pub(crate) struct CloseQueue {
    tx: mpsc::UnboundedSender<CloseRequest>,
    pending: Arc<Mutex<Vec<String>>>,
}

impl CloseQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CloseRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                pending: Arc::new(Mutex::new(Vec::new())),
            },
            rx,
        )
    }

    /// Enqueues a close for `device` and publishes `CloseQueued`.
    pub fn enqueue(&self, device: String, slot: usize, bus: &Bus) {
        bus.publish(
            Event::new(EventKind::CloseQueued)
                .with_device(device.as_str())
                .with_slot(slot),
        );
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(device.clone());
        }
        if self.tx.send(CloseRequest { device, slot }).is_err() {
            warn!("close worker gone; close request dropped");
        }
    }

    /// Device ids whose close calls have not completed yet, in queue order.
    pub fn pending(&self) -> Vec<String> {
        self.pending.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn pending_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.pending)
    }
}

/// Timings for the close worker, split out of [`Config`](crate::Config).
#[derive(Clone, Copy)]
pub(crate) struct CloseTimings {
    pub debounce: Duration,
    pub spacing: Duration,
    pub drain_spacing: Duration,
}

/// Single close worker. Exactly one runs per controller lifetime.
pub(crate) async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<CloseRequest>,
    plugin: PluginRef,
    pending: Arc<Mutex<Vec<String>>>,
    bus: Bus,
    timings: CloseTimings,
    token: CancellationToken,
) {
    loop {
        let req = tokio::select! {
            _ = token.cancelled() => break,
            req = rx.recv() => match req {
                Some(req) => req,
                None => return,
            },
        };

        // Debounce, cut short by shutdown. Either way this request is closed;
        // shutdown only switches how the rest of the backlog is handled.
        let draining = tokio::select! {
            _ = time::sleep(timings.debounce) => false,
            _ = token.cancelled() => true,
        };

        close_one(&plugin, &pending, &bus, &req).await;

        if draining {
            drain(&mut rx, &plugin, &pending, &bus, timings.drain_spacing).await;
            return;
        }

        tokio::select! {
            _ = time::sleep(timings.spacing) => {}
            _ = token.cancelled() => {
                drain(&mut rx, &plugin, &pending, &bus, timings.drain_spacing).await;
                return;
            }
        }
    }

    drain(&mut rx, &plugin, &pending, &bus, timings.drain_spacing).await;
}

async fn drain(
    rx: &mut mpsc::UnboundedReceiver<CloseRequest>,
    plugin: &PluginRef,
    pending: &Arc<Mutex<Vec<String>>>,
    bus: &Bus,
    spacing: Duration,
) {
    while let Ok(req) = rx.try_recv() {
        close_one(plugin, pending, bus, &req).await;
        time::sleep(spacing).await;
    }
}

async fn close_one(
    plugin: &PluginRef,
    pending: &Arc<Mutex<Vec<String>>>,
    bus: &Bus,
    req: &CloseRequest,
) {
    let outcome = plugin.close(&req.device).await;

    if let Ok(mut pending) = pending.lock() {
        if let Some(pos) = pending.iter().position(|d| d == &req.device) {
            pending.remove(pos);
        }
    }

    match outcome {
        Ok(0) => {
            debug!(device = req.device, slot = req.slot, "device closed");
            bus.publish(Event::new(EventKind::CloseCompleted).with_device(req.device.as_str()));
        }
        Ok(code) => {
            warn!(device = req.device, code, "close returned non-zero");
            bus.publish(
                Event::new(EventKind::CloseFailed)
                    .with_device(req.device.as_str())
                    .with_reason(format!("close returned {code}")),
            );
        }
        Err(err) => {
            warn!(device = req.device, error = %err, "close failed");
            bus.publish(
                Event::new(EventKind::CloseFailed)
                    .with_device(req.device.as_str())
                    .with_reason(err.to_string()),
            );
        }
    }
}
