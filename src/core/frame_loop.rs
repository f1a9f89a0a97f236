//! # Per-slot frame loop.
//!
//! One frame loop runs per active slot: verify the device is still attached,
//! pull a frame, hand it to the render host, repeat. The loop owns a
//! consecutive-error budget; any successful presented frame resets it, and
//! exhausting it terminates the loop.
//!
//! Termination is always self-contained: the loop marks its slot inactive on
//! the way out and leaves the device binding in place, so the next
//! reconciliation pass decides whether to vacate the slot (device gone) or
//! set it up again (device still attached).

use std::sync::Arc;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{Event, EventKind};

use super::controller::Controller;

/// Why the loop stopped, recorded on the deactivation event.
enum Exit {
    Disconnected,
    BudgetExhausted,
    Cancelled,
}

impl Exit {
    fn reason(&self) -> &'static str {
        match self {
            Exit::Disconnected => "device disconnected",
            Exit::BudgetExhausted => "frame error budget exhausted",
            Exit::Cancelled => "cancelled",
        }
    }
}

pub(crate) async fn run(
    ctrl: Arc<Controller>,
    slot: usize,
    device: String,
    token: CancellationToken,
) {
    let exit = pump(&ctrl, slot, &device, &token).await;
    debug!(device, slot, reason = exit.reason(), "frame loop exited");
    ctrl.note_frame_loop_exit(slot, exit.reason()).await;
}

async fn pump(
    ctrl: &Controller,
    slot: usize,
    device: &str,
    token: &CancellationToken,
) -> Exit {
    let plugin = ctrl.plugin();
    let render = ctrl.render();
    let budget = ctrl.cfg().frame_error_budget;
    let retry_delay = ctrl.cfg().frame_retry_delay;
    let mut errors: u32 = 0;

    loop {
        if token.is_cancelled() {
            return Exit::Cancelled;
        }

        // Presence check each iteration: a pulled-but-vanished device can
        // otherwise keep returning stale errors until the budget drains.
        match plugin.list_devices().await {
            Ok(devices) => {
                if !devices.iter().any(|d| d == device) {
                    render.clear(slot);
                    render.status(slot, false, Some("device disconnected"));
                    ctrl.bus().publish(
                        Event::new(EventKind::StreamDisconnected)
                            .with_device(device)
                            .with_slot(slot),
                    );
                    return Exit::Disconnected;
                }
            }
            Err(err) => {
                errors += 1;
                warn!(device, slot, consecutive = errors, error = %err, "device check failed");
                if errors >= budget {
                    return Exit::BudgetExhausted;
                }
                tokio::select! {
                    _ = time::sleep(retry_delay) => continue,
                    _ = token.cancelled() => return Exit::Cancelled,
                }
            }
        }

        match plugin.pull_frame(device).await {
            Ok(frame) if !frame.is_empty() => match render.present(slot, &frame) {
                Ok(()) => {
                    errors = 0;
                    tokio::task::yield_now().await;
                }
                Err(err) => {
                    errors += 1;
                    warn!(device, slot, consecutive = errors, error = %err, "frame present failed");
                    if errors >= budget {
                        return Exit::BudgetExhausted;
                    }
                    tokio::task::yield_now().await;
                }
            },
            Ok(_) => {
                errors += 1;
                debug!(device, slot, consecutive = errors, "empty frame");
                if errors >= budget {
                    return Exit::BudgetExhausted;
                }
                tokio::select! {
                    _ = time::sleep(retry_delay) => {}
                    _ = token.cancelled() => return Exit::Cancelled,
                }
            }
            Err(err) => {
                errors += 1;
                warn!(device, slot, consecutive = errors, error = %err, "frame pull failed");
                if errors >= budget {
                    return Exit::BudgetExhausted;
                }
                tokio::select! {
                    _ = time::sleep(retry_delay) => {}
                    _ = token.cancelled() => return Exit::Cancelled,
                }
            }
        }
    }
}
