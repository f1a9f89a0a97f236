//! # campool
//!
//! Async lifecycle controller for a small pool of USB camera sessions.
//!
//! campool keeps a fixed number of slots streaming from whatever cameras are
//! attached: it discovers devices, negotiates host permission, opens and
//! starts streams down a format ladder, pumps frames to a render host, and
//! serializes every device close through a single worker. Hotplug is handled
//! by diffing the device list on a short interval and reconciling the pool
//! against it.
//!
//! ```text
//! ┌─────────────────────────── Controller ───────────────────────────┐
//! │                                                                  │
//! │  watcher ──┐                        ┌─ slot 0 ── frame loop ──┐  │
//! │            ├─► reconcile (gate) ──► ├─ slot 1 ── frame loop ──┤  │
//! │  auto ─────┘     cleanup+register   └─ ...                    │  │
//! │                                                               ▼  │
//! │  close queue ──► close worker (FIFO, debounced)          RenderHost
//! │                                                                  │
//! │  Bus ──► listener ──► SubscriberSet ──► [Subscribe; N]           │
//! └──────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                         DevicePlugin
//! ```
//!
//! The two seams are [`DevicePlugin`] (USB enumeration, permission, capture)
//! and [`RenderHost`] (targets, frames, status text). Everything in between
//! is this crate.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use campool::{
//!     Config, Controller, DevicePlugin, LogWriter, PluginError, RenderError, RenderHost,
//!     StreamFormat,
//! };
//!
//! struct Driver;
//!
//! #[async_trait]
//! impl DevicePlugin for Driver {
//!     async fn list_devices(&self) -> Result<Vec<String>, PluginError> {
//!         Ok(vec!["cam0".into()])
//!     }
//!     async fn request_permission(&self, _device: &str) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!     async fn has_permission(&self, _device: &str) -> Result<bool, PluginError> {
//!         Ok(true)
//!     }
//!     async fn device_info(&self, device: &str) -> Result<String, PluginError> {
//!         Ok(device.to_string())
//!     }
//!     async fn open(&self, _device: &str) -> Result<Vec<String>, PluginError> {
//!         Ok(vec!["YUY2 1280x720".into()])
//!     }
//!     async fn start(&self, _device: &str, _format: &StreamFormat) -> Result<i32, PluginError> {
//!         Ok(0)
//!     }
//!     async fn pull_frame(&self, _device: &str) -> Result<Vec<u8>, PluginError> {
//!         Ok(vec![0u8; 1280 * 720 * 2])
//!     }
//!     async fn close(&self, _device: &str) -> Result<i32, PluginError> {
//!         Ok(0)
//!     }
//! }
//!
//! struct Headless;
//!
//! impl RenderHost for Headless {
//!     fn bind(&self, _slot: usize, _w: u32, _h: u32, _fps: u32) -> bool {
//!         true
//!     }
//!     fn present(&self, _slot: usize, _frame: &[u8]) -> Result<(), RenderError> {
//!         Ok(())
//!     }
//!     fn clear(&self, _slot: usize) {}
//!     fn status(&self, _slot: usize, _active: bool, _message: Option<&str>) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), campool::RuntimeError> {
//!     let ctrl = Controller::builder(Config::default(), Arc::new(Driver), Arc::new(Headless))
//!         .subscriber(Arc::new(LogWriter::default()))
//!         .build();
//!
//!     // Start, stream until SIGINT/SIGTERM, then drain closes and stop.
//!     ctrl.run().await
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod plugin;
mod policies;
mod render;
mod subscribers;

pub use config::{Config, MIN_DETECTION_INTERVAL};
pub use self::core::{Controller, ControllerBuilder, SlotInfo};
pub use error::{PluginError, RuntimeError, SetupError};
pub use events::{Bus, Event, EventKind};
pub use plugin::{DevicePlugin, PluginRef, StreamFormat};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use render::{RenderError, RenderHost, RenderRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
