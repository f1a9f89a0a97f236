//! Shared fakes for integration tests: a scriptable device plugin and a
//! recording render host.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time;

use campool::{DevicePlugin, Event, EventKind, PluginError, RenderError, RenderHost, StreamFormat};

/// What `pull_frame` returns for a device.
#[derive(Clone, Copy, Default)]
pub enum FrameMode {
    /// A small non-empty frame.
    #[default]
    Frames,
    /// Empty buffers (count toward the error budget).
    Empty,
    /// Errors.
    Errors,
}

#[derive(Default)]
struct DeviceScript {
    /// `has_permission` reports granted once this many polls have happened.
    grant_after_polls: u32,
    /// Never grant, regardless of polls.
    never_grant: bool,
    /// First N `open` calls return an empty format list.
    open_failures: u32,
    /// First N `start` calls return a non-zero code.
    start_rejections: u32,
    frame_mode: FrameMode,
    /// `close` blocks far beyond any test's grace period.
    hang_close: bool,
}

#[derive(Default)]
struct DeviceCounters {
    permission_requests: u32,
    permission_polls: u32,
    opens: u32,
    starts: u32,
}

/// Scriptable in-memory [`DevicePlugin`].
///
/// Tests mutate the attached-device list at will and script per-device
/// failure behavior; every call is counted.
#[derive(Default)]
pub struct FakePlugin {
    devices: Mutex<Vec<String>>,
    scripts: Mutex<HashMap<String, DeviceScript>>,
    counters: Mutex<HashMap<String, DeviceCounters>>,
    /// `start` attempts as (device, width, height), in order.
    start_attempts: Mutex<Vec<(String, u32, u32)>>,
    /// Devices in the order their `close` calls completed issuing.
    closed: Mutex<Vec<String>>,
}

impl FakePlugin {
    pub fn new(devices: &[&str]) -> Self {
        let plugin = Self::default();
        plugin.set_devices(devices);
        plugin
    }

    pub fn set_devices(&self, devices: &[&str]) {
        *self.devices.lock().unwrap() = devices.iter().map(|d| d.to_string()).collect();
    }

    pub fn attach(&self, device: &str) {
        self.devices.lock().unwrap().push(device.to_string());
    }

    pub fn detach(&self, device: &str) {
        self.devices.lock().unwrap().retain(|d| d != device);
    }

    // === Scripting ===

    fn script<F: FnOnce(&mut DeviceScript)>(&self, device: &str, f: F) {
        f(self
            .scripts
            .lock()
            .unwrap()
            .entry(device.to_string())
            .or_default());
    }

    /// Permission reports granted starting with the `n`-th poll (1-based).
    pub fn grant_on_poll(&self, device: &str, n: u32) {
        self.script(device, |s| s.grant_after_polls = n.saturating_sub(1));
    }

    pub fn never_grant(&self, device: &str) {
        self.script(device, |s| s.never_grant = true);
    }

    pub fn fail_opens(&self, device: &str, n: u32) {
        self.script(device, |s| s.open_failures = n);
    }

    pub fn reject_starts(&self, device: &str, n: u32) {
        self.script(device, |s| s.start_rejections = n);
    }

    pub fn frame_mode(&self, device: &str, mode: FrameMode) {
        self.script(device, |s| s.frame_mode = mode);
    }

    pub fn hang_close(&self, device: &str) {
        self.script(device, |s| s.hang_close = true);
    }

    // === Inspection ===

    fn counters<R, F: FnOnce(&DeviceCounters) -> R>(&self, device: &str, f: F) -> R {
        f(self
            .counters
            .lock()
            .unwrap()
            .entry(device.to_string())
            .or_default())
    }

    pub fn permission_requests(&self, device: &str) -> u32 {
        self.counters(device, |c| c.permission_requests)
    }

    pub fn permission_polls(&self, device: &str) -> u32 {
        self.counters(device, |c| c.permission_polls)
    }

    pub fn open_calls(&self, device: &str) -> u32 {
        self.counters(device, |c| c.opens)
    }

    pub fn start_calls(&self, device: &str) -> u32 {
        self.counters(device, |c| c.starts)
    }

    pub fn start_attempts(&self) -> Vec<(String, u32, u32)> {
        self.start_attempts.lock().unwrap().clone()
    }

    pub fn closed_order(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    fn bump<F: FnOnce(&mut DeviceCounters)>(&self, device: &str, f: F) {
        f(self
            .counters
            .lock()
            .unwrap()
            .entry(device.to_string())
            .or_default());
    }
}

#[async_trait]
impl DevicePlugin for FakePlugin {
    async fn list_devices(&self) -> Result<Vec<String>, PluginError> {
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn request_permission(&self, device: &str) -> Result<(), PluginError> {
        self.bump(device, |c| c.permission_requests += 1);
        Ok(())
    }

    async fn has_permission(&self, device: &str) -> Result<bool, PluginError> {
        self.bump(device, |c| c.permission_polls += 1);
        let polls = self.permission_polls(device);
        let scripts = self.scripts.lock().unwrap();
        let granted = match scripts.get(device) {
            Some(s) if s.never_grant => false,
            Some(s) => polls > s.grant_after_polls,
            None => true,
        };
        Ok(granted)
    }

    async fn device_info(&self, device: &str) -> Result<String, PluginError> {
        Ok(format!("fake uvc device {device}"))
    }

    async fn open(&self, device: &str) -> Result<Vec<String>, PluginError> {
        self.bump(device, |c| c.opens += 1);
        let opens = self.open_calls(device);
        let failures = self
            .scripts
            .lock()
            .unwrap()
            .get(device)
            .map_or(0, |s| s.open_failures);
        if opens <= failures {
            Ok(Vec::new())
        } else {
            Ok(vec!["YUY2 1280x720 30fps".to_string()])
        }
    }

    async fn start(&self, device: &str, format: &StreamFormat) -> Result<i32, PluginError> {
        self.bump(device, |c| c.starts += 1);
        self.start_attempts
            .lock()
            .unwrap()
            .push((device.to_string(), format.width, format.height));
        let starts = self.start_calls(device);
        let rejections = self
            .scripts
            .lock()
            .unwrap()
            .get(device)
            .map_or(0, |s| s.start_rejections);
        if starts <= rejections {
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn pull_frame(&self, device: &str) -> Result<Vec<u8>, PluginError> {
        // Model capture cadence; also keeps paused-clock tests advancing.
        time::sleep(Duration::from_millis(1)).await;
        let mode = self
            .scripts
            .lock()
            .unwrap()
            .get(device)
            .map_or(FrameMode::Frames, |s| s.frame_mode);
        match mode {
            FrameMode::Frames => Ok(vec![0u8; 16]),
            FrameMode::Empty => Ok(Vec::new()),
            FrameMode::Errors => Err(PluginError::call("pull failed")),
        }
    }

    async fn close(&self, device: &str) -> Result<i32, PluginError> {
        let hang = self
            .scripts
            .lock()
            .unwrap()
            .get(device)
            .map_or(false, |s| s.hang_close);
        if hang {
            time::sleep(Duration::from_secs(3600)).await;
        }
        self.closed.lock().unwrap().push(device.to_string());
        Ok(0)
    }
}

/// Recording [`RenderHost`]: counts presents, remembers binds, clears and
/// status lines, and can be told to refuse binds or fail presents.
#[derive(Default)]
pub struct FakeRender {
    deny_bind: AtomicBool,
    fail_present: AtomicBool,
    binds: Mutex<Vec<(usize, u32, u32, u32)>>,
    presented: Mutex<HashMap<usize, u64>>,
    cleared: Mutex<Vec<usize>>,
    statuses: Mutex<Vec<(usize, bool, Option<String>)>>,
}

impl FakeRender {
    pub fn deny_bind(&self) {
        self.deny_bind.store(true, Ordering::SeqCst);
    }

    pub fn fail_present(&self, fail: bool) {
        self.fail_present.store(fail, Ordering::SeqCst);
    }

    pub fn presented_count(&self, slot: usize) -> u64 {
        self.presented.lock().unwrap().get(&slot).copied().unwrap_or(0)
    }

    pub fn last_bind(&self, slot: usize) -> Option<(u32, u32, u32)> {
        self.binds
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, ..)| *s == slot)
            .map(|&(_, w, h, fps)| (w, h, fps))
    }

    pub fn cleared(&self) -> Vec<usize> {
        self.cleared.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(usize, bool, Option<String>)> {
        self.statuses.lock().unwrap().clone()
    }
}

impl RenderHost for FakeRender {
    fn bind(&self, slot: usize, width: u32, height: u32, fps: u32) -> bool {
        if self.deny_bind.load(Ordering::SeqCst) {
            return false;
        }
        self.binds.lock().unwrap().push((slot, width, height, fps));
        true
    }

    fn present(&self, slot: usize, _frame: &[u8]) -> Result<(), RenderError> {
        if self.fail_present.load(Ordering::SeqCst) {
            return Err(RenderError("present refused".to_string()));
        }
        *self.presented.lock().unwrap().entry(slot).or_insert(0) += 1;
        Ok(())
    }

    fn clear(&self, slot: usize) {
        self.cleared.lock().unwrap().push(slot);
    }

    fn status(&self, slot: usize, active: bool, message: Option<&str>) {
        self.statuses
            .lock()
            .unwrap()
            .push((slot, active, message.map(|m| m.to_string())));
    }
}

/// Receives events until one of the given kind arrives (simulated-time
/// bounded).
pub async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    time::timeout(Duration::from_secs(300), async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {kind:?}"))
}

/// Like [`wait_for`], but returns every event received along the way, the
/// matching one last. Lets tests assert on what did NOT happen before a
/// landmark event.
pub async fn collect_until(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Vec<Event> {
    time::timeout(Duration::from_secs(300), async {
        let mut seen = Vec::new();
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let done = ev.kind == kind;
                    seen.push(ev);
                    if done {
                        return seen;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out collecting until {kind:?}"))
}

/// Drains everything already buffered on the receiver without waiting.
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut seen = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => seen.push(ev),
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => return seen,
        }
    }
}
