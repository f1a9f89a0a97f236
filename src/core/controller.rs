//! # The session-pool controller.
//!
//! [`Controller`] owns the fixed-capacity slot pool and every long-lived task
//! around it: the device watcher, the auto-management tick, the close worker,
//! the event listener, and one frame loop per active slot.
//!
//! ## Reconciliation
//! All pool mutation funnels through one reconciliation pass: cleanup (vacate
//! slots whose device vanished) followed by register (claim attached devices
//! into empty slots and set them up). Passes are mutually exclusive via a
//! `try_lock` gate; a trigger that finds a pass in flight is dropped, not
//! queued, because the running pass already observes a device list at least
//! as fresh as the trigger's.
//!
//! ## Lifetime
//! A controller runs once: `start()` then `stop()` (or `run()`, which wires
//! OS signals between the two). `stop()` bounds teardown by the configured
//! grace period and reports closes that did not finish in time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, MIN_DETECTION_INTERVAL};
use crate::error::{RuntimeError, SetupError};
use crate::events::{Bus, Event, EventKind};
use crate::plugin::PluginRef;
use crate::render::RenderRef;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::closer::{self, CloseQueue, CloseRequest, CloseTimings};
use super::slot::{FrameTaskHandle, Slot, SlotInfo};
use super::state::ControllerState;
use super::{frame_loop, negotiator, shutdown, starter, watcher};

/// Builder for [`Controller`].
pub struct ControllerBuilder {
    cfg: Config,
    plugin: PluginRef,
    render: RenderRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ControllerBuilder {
    /// Attaches an event subscriber (fan-out starts at `start()`).
    #[must_use]
    pub fn subscriber(mut self, sub: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(sub);
        self
    }

    /// Builds the controller. Nothing runs until `start()`.
    pub fn build(self) -> Arc<Controller> {
        let mut cfg = self.cfg;
        cfg.capacity = cfg.capacity.max(1);

        let (close_queue, close_rx) = CloseQueue::new();
        let slots = (0..cfg.capacity).map(|_| Slot::new()).collect();
        let state = ControllerState::new(cfg.auto_detect, cfg.detection_interval);
        let bus = Bus::new(cfg.bus_capacity);

        Arc::new(Controller {
            cfg,
            plugin: self.plugin,
            render: self.render,
            bus,
            state: RwLock::new(state),
            slots: RwLock::new(slots),
            reconcile_gate: Mutex::new(()),
            close_queue,
            close_rx: StdMutex::new(Some(close_rx)),
            frame_root: StdRwLock::new(CancellationToken::new()),
            subscribers: StdMutex::new(self.subscribers),
            runtime: Mutex::new(None),
        })
    }
}

/// Handles to the controller's long-lived tasks, held between start and stop.
struct RuntimeHandles {
    token: CancellationToken,
    watcher: JoinHandle<()>,
    auto: JoinHandle<()>,
    listener: JoinHandle<()>,
    listener_token: CancellationToken,
    closer: JoinHandle<()>,
    closer_token: CancellationToken,
}

/// USB camera session-pool controller.
pub struct Controller {
    cfg: Config,
    plugin: PluginRef,
    render: RenderRef,
    bus: Bus,

    state: RwLock<ControllerState>,
    slots: RwLock<Vec<Slot>>,

    /// Mutual exclusion for reconciliation passes; `try_lock` failure means a
    /// pass is already in flight and the trigger is dropped.
    reconcile_gate: Mutex<()>,

    close_queue: CloseQueue,
    close_rx: StdMutex<Option<mpsc::UnboundedReceiver<CloseRequest>>>,

    /// Parent token for frame loops; replaced at each `start()`.
    frame_root: StdRwLock<CancellationToken>,

    subscribers: StdMutex<Vec<Arc<dyn Subscribe>>>,
    runtime: Mutex<Option<RuntimeHandles>>,
}

impl Controller {
    /// Starts building a controller around a plugin and a render host.
    pub fn builder(cfg: Config, plugin: PluginRef, render: RenderRef) -> ControllerBuilder {
        ControllerBuilder {
            cfg,
            plugin,
            render,
            subscribers: Vec::new(),
        }
    }

    // === Lifecycle ===

    /// Starts the controller: spawns the event listener and close worker,
    /// runs the initial discovery-and-setup pass, then launches the device
    /// watcher and the auto-management tick.
    ///
    /// Returns once initial setup has finished (successfully or not); from
    /// then on the watcher and auto-management own the pool.
    pub async fn start(self: &Arc<Self>) -> Result<(), RuntimeError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            return Err(RuntimeError::AlreadyRunning);
        }
        // A controller is single-run: after stop() the close queue's receiver
        // is gone for good.
        let Some(close_rx) = self.close_rx.lock().ok().and_then(|mut rx| rx.take()) else {
            return Err(RuntimeError::AlreadyRunning);
        };

        let token = CancellationToken::new();
        if let Ok(mut root) = self.frame_root.write() {
            *root = token.child_token();
        }

        let listener_token = CancellationToken::new();
        let listener = self.spawn_listener(listener_token.clone());

        let closer_token = CancellationToken::new();
        let closer = tokio::spawn(closer::run_worker(
            close_rx,
            Arc::clone(&self.plugin),
            self.close_queue.pending_handle(),
            self.bus.clone(),
            CloseTimings {
                debounce: self.cfg.close_debounce,
                spacing: self.cfg.close_spacing,
                drain_spacing: self.cfg.drain_spacing,
            },
            closer_token.clone(),
        ));

        self.state.write().await.initialized = true;
        info!(capacity = self.cfg.capacity, "controller starting");

        let discovered;
        {
            let _gate = self.reconcile_gate.lock().await;
            discovered = self.initial_setup().await;
            self.state.write().await.first_setup_done = true;
        }

        // The watcher's baseline is the discovery list; its first tick only
        // reports what changed while the initial pass ran.
        let watcher = tokio::spawn(watcher::run(
            Arc::clone(self),
            discovered,
            token.child_token(),
        ));
        let auto = tokio::spawn(Arc::clone(self).auto_manage_loop(token.child_token()));

        *runtime = Some(RuntimeHandles {
            token,
            watcher,
            auto,
            listener,
            listener_token,
            closer,
            closer_token,
        });
        Ok(())
    }

    /// Stops the controller: cancels the watcher, auto-management and frame
    /// loops, vacates every slot (enqueueing closes), then waits up to the
    /// grace period for the close worker to drain.
    ///
    /// Idempotent: a second call returns `Ok(())` immediately.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        let handles = { self.runtime.lock().await.take() };
        let Some(h) = handles else { return Ok(()) };

        info!("controller stopping");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.state.write().await.initialized = false;

        h.token.cancel();
        let _ = h.watcher.await;
        let _ = h.auto.await;

        for index in 0..self.cfg.capacity {
            if let Some(device) = self.vacate_slot(index, "stopped", "shutdown").await {
                self.close_queue.enqueue(device, index, &self.bus);
            }
        }

        h.closer_token.cancel();
        let drained = time::timeout(self.cfg.grace, h.closer).await.is_ok();

        let result = if drained {
            self.bus.publish(Event::new(EventKind::AllClosedWithin));
            info!("all closes drained");
            Ok(())
        } else {
            let pending = self.close_queue.pending();
            self.bus.publish(Event::new(EventKind::GraceExceeded));
            warn!(?pending, grace = ?self.cfg.grace, "shutdown grace exceeded");
            Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                pending,
            })
        };

        // The listener outlives everything else so teardown events reach
        // subscribers; it drains its backlog on cancellation.
        h.listener_token.cancel();
        let _ = h.listener.await;

        result
    }

    /// Convenience entry point: start, wait for SIGINT/SIGTERM, stop.
    pub async fn run(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.start().await?;
        shutdown::wait_for_shutdown_signal().await;
        self.stop().await
    }

    // === Runtime controls ===

    /// Enables or disables the auto-management tick.
    pub async fn set_auto_detect(&self, enabled: bool) {
        self.state.write().await.auto_detect = enabled;
        info!(enabled, "auto-detect toggled");
    }

    /// Sets the auto-management tick interval, floored at
    /// [`MIN_DETECTION_INTERVAL`].
    pub async fn set_detection_interval(&self, interval: Duration) {
        let clamped = interval.max(MIN_DETECTION_INTERVAL);
        self.state.write().await.detection_interval = clamped;
        info!(interval = ?clamped, "detection interval updated");
    }

    /// True between a successful `start()` and `stop()`.
    pub async fn is_running(&self) -> bool {
        self.state.read().await.initialized
    }

    /// Number of actively streaming slots.
    pub async fn active_count(&self) -> usize {
        self.slots.read().await.iter().filter(|s| s.active).count()
    }

    /// Point-in-time snapshot of every slot.
    pub async fn slots(&self) -> Vec<SlotInfo> {
        self.slots
            .read()
            .await
            .iter()
            .enumerate()
            .map(|(index, s)| SlotInfo {
                index,
                device_id: s.device_id.clone(),
                active: s.active,
                width: s.width,
                height: s.height,
                fps: s.fps,
            })
            .collect()
    }

    /// Subscribes to the raw event stream (independent of [`Subscribe`]
    /// fan-out; only events published after the call are observed).
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Swaps the device bindings of two active slots and relaunches their
    /// frame loops against the exchanged render targets.
    ///
    /// Returns `false` without touching anything when the indices are
    /// invalid, equal, or either slot is not active.
    pub async fn swap_slots(self: &Arc<Self>, a: usize, b: usize) -> bool {
        let cap = self.cfg.capacity;
        if a == b || a >= cap || b >= cap {
            return false;
        }
        let _gate = self.reconcile_gate.lock().await;

        {
            let slots = self.slots.read().await;
            if !slots[a].active || !slots[b].active {
                return false;
            }
        }

        // Pause both loops first; a frame loop carries its slot index, so it
        // cannot survive its binding moving.
        for index in [a, b] {
            let task = {
                let mut slots = self.slots.write().await;
                slots[index].active = false;
                slots[index].frame_task.take()
            };
            if let Some(task) = task {
                task.cancel.cancel();
                let _ = task.join.await;
            }
        }

        // Both slots are now inactive with no task; exchanging them wholesale
        // moves device id and geometry together.
        self.slots.write().await.swap(a, b);

        for index in [a, b] {
            let (device, width, height, fps) = {
                let slots = self.slots.read().await;
                let s = &slots[index];
                (s.device_id.clone(), s.width, s.height, s.fps)
            };
            let Some(device) = device else { continue };
            if !self.render.bind(index, width, height, fps) {
                warn!(device = device.as_str(), slot = index, "no render target after swap");
                continue;
            }
            self.launch_frame_loop(index, &device).await;
            self.render.status(index, true, Some(&device));
            self.bus.publish(
                Event::new(EventKind::SlotActivated)
                    .with_device(device.as_str())
                    .with_slot(index)
                    .with_geometry(width, height),
            );
        }

        info!(a, b, "slots swapped");
        true
    }

    // === Crate-internal accessors ===

    pub(crate) fn plugin(&self) -> &PluginRef {
        &self.plugin
    }

    pub(crate) fn render(&self) -> &RenderRef {
        &self.render
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    pub(crate) fn cfg(&self) -> &Config {
        &self.cfg
    }

    // === Reconciliation ===

    /// Runs one cleanup-then-register pass against `current`, unless a pass
    /// is already in flight (the trigger is then dropped).
    pub(crate) async fn try_reconcile(self: &Arc<Self>, current: &[String]) {
        let Ok(_gate) = self.reconcile_gate.try_lock() else {
            debug!("reconciliation already in flight; trigger dropped");
            return;
        };
        self.cleanup(current).await;
        self.register(current).await;
    }

    /// Vacates every slot whose bound device is absent from `current` and
    /// enqueues a close for it.
    async fn cleanup(&self, current: &[String]) {
        for index in 0..self.cfg.capacity {
            let stale = {
                let slots = self.slots.read().await;
                slots[index]
                    .device_id
                    .clone()
                    .filter(|d| !current.contains(d))
            };
            if stale.is_none() {
                continue;
            }
            if let Some(device) = self
                .vacate_slot(index, "no device connected", "device removed")
                .await
            {
                self.close_queue.enqueue(device, index, &self.bus);
            }
            time::sleep(self.cfg.cleanup_spacing).await;
        }
    }

    /// Claims unbound devices from `current` into empty slots, in order, and
    /// sets each one up. Every claimed candidate is consumed whether or not
    /// its setup succeeds.
    async fn register(self: &Arc<Self>, current: &[String]) {
        let bound: Vec<String> = {
            let slots = self.slots.read().await;
            slots
                .iter()
                .filter(|s| s.active)
                .filter_map(|s| s.device_id.clone())
                .collect()
        };
        let mut candidates: VecDeque<String> = current
            .iter()
            .filter(|d| !bound.contains(d))
            .cloned()
            .collect();

        for index in 0..self.cfg.capacity {
            if candidates.is_empty() {
                break;
            }
            let occupied = self.slots.read().await[index].active;
            if occupied {
                continue;
            }
            let Some(device) = candidates.pop_front() else { break };
            self.claim_and_setup(index, device).await;
            time::sleep(self.cfg.register_settle).await;
        }
    }

    /// Binds `device` to the slot and runs a full setup. On failure the slot
    /// is cleared back to empty and the failure surfaces as an event plus
    /// status text; the device stays eligible for the next pass.
    async fn claim_and_setup(self: &Arc<Self>, index: usize, device: String) -> bool {
        self.slots.write().await[index].device_id = Some(device.clone());

        match self.setup_camera(index, &device).await {
            Ok(()) => true,
            Err(err) => {
                warn!(device = device.as_str(), slot = index, error = %err, "setup failed");
                self.bus.publish(
                    Event::new(EventKind::SetupFailed)
                        .with_device(device.as_str())
                        .with_slot(index)
                        .with_reason(err.as_label()),
                );
                self.render.status(index, false, Some(&err.to_string()));
                {
                    let mut slots = self.slots.write().await;
                    slots[index].device_id = None;
                    slots[index].active = false;
                }
                // The stream is already running on this path and must still
                // be released.
                if matches!(err, SetupError::NoRenderTarget { .. }) {
                    self.close_queue.enqueue(device, index, &self.bus);
                }
                false
            }
        }
    }

    /// Full setup for a claimed slot: permission negotiation, open and
    /// stream start, then frame-loop launch.
    async fn setup_camera(self: &Arc<Self>, index: usize, device: &str) -> Result<(), SetupError> {
        let granted = negotiator::negotiate(&self.plugin, device, &self.cfg.permission, &self.bus)
            .await
            || self.final_permission_check(device).await;
        if !granted {
            return Err(SetupError::PermissionDenied {
                device: device.to_string(),
            });
        }

        let stream = starter::run_camera(&self.plugin, &self.render, &self.cfg, index, device).await?;

        {
            let mut slots = self.slots.write().await;
            let s = &mut slots[index];
            s.width = stream.width;
            s.height = stream.height;
            s.fps = stream.fps;
        }
        self.launch_frame_loop(index, device).await;

        self.render.status(index, true, Some(device));
        self.bus.publish(
            Event::new(EventKind::SlotActivated)
                .with_device(device)
                .with_slot(index)
                .with_geometry(stream.width, stream.height),
        );
        Ok(())
    }

    /// A grant can land between the negotiator's last poll and now, so poll
    /// exhaustion alone does not fail the setup.
    async fn final_permission_check(&self, device: &str) -> bool {
        match self.plugin.has_permission(device).await {
            Ok(granted) => granted,
            Err(err) => {
                warn!(device, error = %err, "final permission check failed");
                false
            }
        }
    }

    /// Marks the slot active and spawns its frame loop under the current
    /// runtime's frame-root token.
    async fn launch_frame_loop(self: &Arc<Self>, index: usize, device: &str) {
        let cancel = self
            .frame_root
            .read()
            .map(|root| root.child_token())
            .unwrap_or_default();

        let mut slots = self.slots.write().await;
        let s = &mut slots[index];
        s.active = true;
        let join = tokio::spawn(frame_loop::run(
            Arc::clone(self),
            index,
            device.to_string(),
            cancel.clone(),
        ));
        s.frame_task = Some(FrameTaskHandle { join, cancel });
    }

    /// Empties a slot: cancels and joins its frame loop, clears the device
    /// binding and render target, and publishes the deactivation if the slot
    /// was still active. Returns the device that occupied it, if any.
    async fn vacate_slot(&self, index: usize, status: &str, reason: &str) -> Option<String> {
        let (task, device, was_active) = {
            let mut slots = self.slots.write().await;
            let s = &mut slots[index];
            (
                s.frame_task.take(),
                s.device_id.take(),
                std::mem::replace(&mut s.active, false),
            )
        };

        if let Some(task) = task {
            task.cancel.cancel();
            let _ = task.join.await;
        }

        if device.is_none() && !was_active {
            return None;
        }

        self.render.clear(index);
        self.render.status(index, false, Some(status));

        if was_active {
            let mut ev = Event::new(EventKind::SlotDeactivated)
                .with_slot(index)
                .with_reason(reason);
            if let Some(d) = &device {
                ev = ev.with_device(d.as_str());
            }
            self.bus.publish(ev);
        }
        device
    }

    /// Frame loops report their own termination here; external vacates have
    /// already flipped the slot inactive, making this a no-op for them.
    pub(crate) async fn note_frame_loop_exit(&self, index: usize, reason: &str) {
        let device = {
            let mut slots = self.slots.write().await;
            let s = &mut slots[index];
            if !s.active {
                return;
            }
            s.active = false;
            s.frame_task = None;
            s.device_id.clone()
        };
        let mut ev = Event::new(EventKind::SlotDeactivated)
            .with_slot(index)
            .with_reason(reason);
        if let Some(d) = &device {
            ev = ev.with_device(d.as_str());
        }
        self.bus.publish(ev);
    }

    // === Startup and background ticks ===

    /// Initial discovery and setup: retries enumeration until devices appear
    /// (or the schedule is exhausted), then fills slots in enumeration order.
    /// Returns the discovery list, which seeds the watcher's known set.
    async fn initial_setup(self: &Arc<Self>) -> Vec<String> {
        let mut devices = Vec::new();
        for attempt in 0..self.cfg.discovery.max_attempts {
            match self.plugin.list_devices().await {
                Ok(list) if !list.is_empty() => {
                    devices = list;
                    break;
                }
                Ok(_) => debug!(attempt, "no devices enumerated yet"),
                Err(err) => warn!(attempt, error = %err, "device discovery failed"),
            }
            if let Some(delay) = self.cfg.discovery.delay_after(attempt) {
                time::sleep(delay).await;
            }
        }

        if devices.is_empty() {
            info!("no devices at startup; watcher takes over");
            return devices;
        }

        info!(found = devices.len(), "initial devices discovered");
        for (index, device) in devices.iter().take(self.cfg.capacity).enumerate() {
            self.claim_and_setup(index, device.clone()).await;
            time::sleep(self.cfg.register_settle).await;
        }
        devices
    }

    /// Periodic self-healing tick; dormant until initial setup finishes and
    /// while auto-detect is disabled.
    async fn auto_manage_loop(self: Arc<Self>, token: CancellationToken) {
        tokio::select! {
            _ = time::sleep(self.cfg.auto_detect_delay) => {}
            _ = token.cancelled() => return,
        }

        loop {
            let interval = self
                .state
                .read()
                .await
                .detection_interval
                .max(MIN_DETECTION_INTERVAL);
            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = token.cancelled() => return,
            }

            let (enabled, ready) = {
                let state = self.state.read().await;
                (state.auto_detect, state.initialized && state.first_setup_done)
            };
            if !enabled || !ready {
                continue;
            }

            tokio::select! {
                _ = self.auto_manage_tick() => {}
                _ = token.cancelled() => return,
            }
        }
    }

    /// One auto-management decision: with fewer devices than pool capacity,
    /// always reconcile (cheap, and a lone device may be waiting for a slot);
    /// at or above capacity, only when slots are idle or an active device is
    /// gone from the list.
    async fn auto_manage_tick(self: &Arc<Self>) {
        let current = match self.plugin.list_devices().await {
            Ok(current) => current,
            Err(err) => {
                warn!(error = %err, "auto-management enumeration failed");
                return;
            }
        };

        if current.len() < self.cfg.capacity {
            self.try_reconcile(&current).await;
            return;
        }

        let (active, missing) = {
            let slots = self.slots.read().await;
            let active = slots.iter().filter(|s| s.active).count();
            let missing = slots.iter().any(|s| {
                s.active
                    && s.device_id
                        .as_ref()
                        .map_or(false, |d| !current.contains(d))
            });
            (active, missing)
        };

        if active < current.len().min(self.cfg.capacity) || missing {
            self.try_reconcile(&current).await;
        }
    }

    /// Bridges the bus to the subscriber fan-out. Drains its backlog on
    /// cancellation so teardown events still reach subscribers.
    fn spawn_listener(&self, token: CancellationToken) -> JoinHandle<()> {
        let subs = self
            .subscribers
            .lock()
            .map(|mut s| std::mem::take(&mut *s))
            .unwrap_or_default();
        let mut events = self.bus.subscribe();

        tokio::spawn(async move {
            let set = SubscriberSet::new(subs);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        loop {
                            match events.try_recv() {
                                Ok(ev) => set.emit(&ev),
                                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                                    warn!(skipped = n, "event listener lagged");
                                }
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                    ev = events.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "event listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            set.shutdown().await;
        })
    }
}
