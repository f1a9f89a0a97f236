//! # Device watcher.
//!
//! Polls the plugin's device list on a short interval and diffs it against
//! the previous tick. Any delta publishes attach/detach events and triggers a
//! reconciliation pass; newly attached devices without permission get a
//! fire-and-forget permission request so the grant is usually already in
//! place by the time a slot claims them.
//!
//! The known set is seeded with the list observed by initial discovery, so
//! the first tick diffs only genuine post-startup changes instead of echoing
//! an attach for every device the initial pass already bound.
//!
//! Enumeration failures skip the tick without touching the known list, so a
//! flaky enumeration cannot masquerade as a mass detach.

use std::sync::Arc;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::events::{Event, EventKind};

use super::controller::Controller;

pub(crate) async fn run(
    ctrl: Arc<Controller>,
    initial_known: Vec<String>,
    token: CancellationToken,
) {
    let mut known = initial_known;
    let interval = ctrl.cfg().monitor_interval;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick(&ctrl, &mut known) => {}
        }
        tokio::select! {
            _ = time::sleep(interval) => {}
            _ = token.cancelled() => break,
        }
    }
}

async fn tick(ctrl: &Arc<Controller>, known: &mut Vec<String>) {
    let plugin = ctrl.plugin();

    let current = match plugin.list_devices().await {
        Ok(current) => current,
        Err(err) => {
            warn!(error = %err, "device enumeration failed; skipping tick");
            return;
        }
    };

    let attached: Vec<&String> = current.iter().filter(|d| !known.contains(d)).collect();
    let detached: Vec<&String> = known.iter().filter(|d| !current.contains(d)).collect();

    for device in &attached {
        ctrl.bus()
            .publish(Event::new(EventKind::DeviceAttached).with_device(device.as_str()));
    }
    for device in &detached {
        ctrl.bus()
            .publish(Event::new(EventKind::DeviceDetached).with_device(device.as_str()));
    }

    if !attached.is_empty() || !detached.is_empty() {
        ctrl.try_reconcile(&current).await;
    }

    // Warm up permission for new arrivals so the next register pass does not
    // spend its whole polling schedule waiting on the dialog.
    for device in &attached {
        match plugin.has_permission(device).await {
            Ok(true) => {}
            Ok(false) => {
                ctrl.bus()
                    .publish(Event::new(EventKind::PermissionRequested).with_device(device.as_str()));
                if let Err(err) = plugin.request_permission(device).await {
                    warn!(device = device.as_str(), error = %err, "permission request failed");
                }
            }
            Err(err) => {
                warn!(device = device.as_str(), error = %err, "permission check failed");
            }
        }
    }

    *known = current;
}
