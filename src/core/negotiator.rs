//! # Permission negotiation.
//!
//! Host permission for a camera is granted asynchronously (a dialog, a
//! platform service); the plugin only exposes a request call and a poll. The
//! negotiator issues the request, then polls on a fixed schedule, re-issuing
//! the request on every second poll in case the first one was lost.

use tokio::time;
use tracing::{debug, warn};

use crate::events::{Bus, Event, EventKind};
use crate::plugin::PluginRef;
use crate::policies::RetryPolicy;

/// Requests permission for `device` and polls until granted or exhausted.
///
/// Returns `true` as soon as a poll reports the grant. Returns `false` after
/// the schedule is exhausted; the caller makes its own final check before
/// declaring the setup failed, since a grant can land between the last poll
/// and now.
pub(crate) async fn negotiate(
    plugin: &PluginRef,
    device: &str,
    policy: &RetryPolicy,
    bus: &Bus,
) -> bool {
    request(plugin, device, bus).await;

    for attempt in 0..policy.max_attempts {
        match plugin.has_permission(device).await {
            Ok(true) => {
                bus.publish(
                    Event::new(EventKind::PermissionGranted)
                        .with_device(device)
                        .with_attempt(attempt + 1),
                );
                return true;
            }
            Ok(false) => {
                debug!(device, attempt, "permission not yet granted");
            }
            Err(err) => {
                warn!(device, error = %err, "permission poll failed");
            }
        }

        // Odd polls re-issue the request: the host may have dropped or never
        // shown the first dialog.
        if attempt % 2 == 1 {
            request(plugin, device, bus).await;
        }

        time::sleep(policy.backoff.next(attempt)).await;
    }

    false
}

async fn request(plugin: &PluginRef, device: &str, bus: &Bus) {
    bus.publish(Event::new(EventKind::PermissionRequested).with_device(device));
    if let Err(err) = plugin.request_permission(device).await {
        warn!(device, error = %err, "permission request failed");
    }
}
