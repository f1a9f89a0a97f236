//! # Device open and stream start.
//!
//! Runs the open-and-start half of a slot setup: fetch device info
//! (best-effort), let the device settle, open it with retries, then walk the
//! stream-format ladder until the plugin accepts a rung, and finally bind the
//! slot's render target to the accepted geometry.

use tokio::time;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::SetupError;
use crate::plugin::PluginRef;
use crate::render::RenderRef;

/// Geometry of an accepted stream, recorded on the slot.
pub(crate) struct StartedStream {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Opens `device` and starts a stream for `slot`.
///
/// On `Ok`, the stream is running and the render target is bound. On
/// `Err(NoRenderTarget)`, the stream is *also* running; the caller must
/// enqueue a close for the device.
pub(crate) async fn run_camera(
    plugin: &PluginRef,
    render: &RenderRef,
    cfg: &Config,
    slot: usize,
    device: &str,
) -> Result<StartedStream, SetupError> {
    match plugin.device_info(device).await {
        Ok(info) => debug!(device, info, "device info"),
        Err(err) => warn!(device, error = %err, "device info unavailable"),
    }

    // Devices fresh off a permission grant may reject an immediate open.
    time::sleep(cfg.settle).await;

    open_with_retries(plugin, cfg, device).await?;

    let format = start_with_ladder(plugin, cfg, device).await?;

    if !render.bind(slot, format.width, format.height, format.fps) {
        return Err(SetupError::NoRenderTarget {
            slot,
            device: device.to_string(),
        });
    }

    Ok(format)
}

async fn open_with_retries(
    plugin: &PluginRef,
    cfg: &Config,
    device: &str,
) -> Result<(), SetupError> {
    for attempt in 0..cfg.open.max_attempts {
        match plugin.open(device).await {
            Ok(formats) if !formats.is_empty() => {
                debug!(device, formats = formats.len(), "device opened");
                return Ok(());
            }
            Ok(_) => warn!(device, attempt, "open returned no formats"),
            Err(err) => warn!(device, attempt, error = %err, "open failed"),
        }
        if let Some(delay) = cfg.open.delay_after(attempt) {
            time::sleep(delay).await;
        }
    }
    Err(SetupError::OpenFailed {
        device: device.to_string(),
        attempts: cfg.open.max_attempts,
    })
}

async fn start_with_ladder(
    plugin: &PluginRef,
    cfg: &Config,
    device: &str,
) -> Result<StartedStream, SetupError> {
    for (rung, format) in cfg.ladder.iter().enumerate() {
        match plugin.start(device, format).await {
            Ok(0) => {
                debug!(
                    device,
                    rung,
                    width = format.width,
                    height = format.height,
                    fps = format.fps,
                    "stream started"
                );
                return Ok(StartedStream {
                    width: format.width,
                    height: format.height,
                    fps: format.fps,
                });
            }
            Ok(code) => warn!(
                device,
                rung,
                code,
                width = format.width,
                height = format.height,
                "stream start rejected"
            ),
            Err(err) => warn!(device, rung, error = %err, "stream start failed"),
        }
    }
    Err(SetupError::StreamStartFailed {
        device: device.to_string(),
    })
}
