//! Pool lifecycle coverage: initial fill, hotplug attach/detach, frame-loop
//! error budgets, auto-management recovery, and slot swapping.

mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use campool::{Config, Controller, EventKind};
use support::{collect_until, drain_events, wait_for, FakePlugin, FakeRender, FrameMode};

fn fast_discovery() -> Config {
    // Short discovery so empty-start tests hand over to the watcher quickly.
    Config {
        discovery: campool::RetryPolicy::fixed(2, Duration::from_millis(100)),
        ..Config::default()
    }
}

#[tokio::test(start_paused = true)]
async fn initial_setup_fills_slots_in_order() {
    let plugin = Arc::new(FakePlugin::new(&["camA", "camB"]));
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin, render.clone()).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();

    assert_eq!(ctrl.active_count().await, 2);
    let slots = ctrl.slots().await;
    assert_eq!(slots[0].device_id.as_deref(), Some("camA"));
    assert_eq!(slots[1].device_id.as_deref(), Some("camB"));

    // Both frame loops are pumping.
    time::sleep(Duration::from_secs(1)).await;
    assert!(render.presented_count(0) > 0);
    assert!(render.presented_count(1) > 0);

    // The watcher starts from the discovery list, so devices bound during
    // the initial pass are never re-announced as attached.
    assert!(drain_events(&mut rx)
        .iter()
        .all(|ev| ev.kind != EventKind::DeviceAttached));

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn pool_never_exceeds_capacity() {
    let plugin = Arc::new(FakePlugin::new(&["camA", "camB", "camC"]));
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin.clone(), render).build();

    ctrl.start().await.unwrap();

    assert_eq!(ctrl.active_count().await, 2);
    let slots = ctrl.slots().await;
    assert_eq!(slots[0].device_id.as_deref(), Some("camA"));
    assert_eq!(slots[1].device_id.as_deref(), Some("camB"));
    assert_eq!(plugin.open_calls("camC"), 0);

    // Free a slot; it goes to the device that was waiting.
    time::sleep(Duration::from_secs(1)).await;
    let mut rx = ctrl.subscribe_events();
    plugin.detach("camA");
    let activated = wait_for(&mut rx, EventKind::SlotActivated).await;
    assert_eq!(activated.device.as_deref(), Some("camC"));
    assert_eq!(activated.slot, Some(0));
    assert_eq!(ctrl.active_count().await, 2);
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(plugin.closed_order(), vec!["camA".to_string()]);

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn watcher_picks_up_device_attached_after_start() {
    let plugin = Arc::new(FakePlugin::new(&[]));
    let render = Arc::new(FakeRender::default());
    let cfg = Config {
        auto_detect: false,
        ..fast_discovery()
    };
    let ctrl = Controller::builder(cfg, plugin.clone(), render).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();
    assert_eq!(ctrl.active_count().await, 0);

    plugin.attach("camA");

    let attached = wait_for(&mut rx, EventKind::DeviceAttached).await;
    assert_eq!(attached.device.as_deref(), Some("camA"));
    let activated = wait_for(&mut rx, EventKind::SlotActivated).await;
    assert_eq!(activated.slot, Some(0));
    assert_eq!(ctrl.active_count().await, 1);

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn detach_vacates_slot_and_closes_device() {
    let plugin = Arc::new(FakePlugin::new(&["camA", "camB"]));
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin.clone(), render.clone()).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();
    assert_eq!(ctrl.active_count().await, 2);

    // Settle so the watcher's known set holds both devices before the detach.
    time::sleep(Duration::from_secs(1)).await;
    plugin.detach("camB");

    let closed = wait_for(&mut rx, EventKind::CloseCompleted).await;
    assert_eq!(closed.device.as_deref(), Some("camB"));
    assert_eq!(plugin.closed_order(), vec!["camB".to_string()]);
    let slots = ctrl.slots().await;
    assert_eq!(slots[1].device_id, None);
    assert!(!slots[1].active);
    // The surviving slot is untouched.
    assert_eq!(slots[0].device_id.as_deref(), Some("camA"));
    assert!(slots[0].active);
    assert!(render.cleared().contains(&1));

    // Further ticks with the same device list change nothing: cleanup is
    // idempotent and no second close is enqueued.
    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(plugin.closed_order(), vec!["camB".to_string()]);
    assert_eq!(ctrl.active_count().await, 1);

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn mid_stream_disconnect_is_reported_then_closed() {
    let plugin = Arc::new(FakePlugin::new(&["camA"]));
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin.clone(), render).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();
    time::sleep(Duration::from_secs(1)).await;
    plugin.detach("camA");

    // The frame loop's per-iteration presence check beats the watcher tick.
    let gone = wait_for(&mut rx, EventKind::StreamDisconnected).await;
    assert_eq!(gone.device.as_deref(), Some("camA"));
    assert_eq!(gone.slot, Some(0));

    // The next reconciliation pass vacates the binding and releases the
    // device handle.
    wait_for(&mut rx, EventKind::CloseCompleted).await;
    assert_eq!(plugin.closed_order(), vec!["camA".to_string()]);
    assert_eq!(ctrl.slots().await[0].device_id, None);

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn error_budget_exhaustion_deactivates_slot() {
    let plugin = Arc::new(FakePlugin::new(&["camA"]));
    plugin.frame_mode("camA", FrameMode::Errors);
    let render = Arc::new(FakeRender::default());
    let cfg = Config {
        auto_detect: false,
        ..Config::default()
    };
    let ctrl = Controller::builder(cfg, plugin.clone(), render.clone()).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();

    let seen = collect_until(&mut rx, EventKind::SlotDeactivated).await;
    let deactivated = seen.last().unwrap();
    assert_eq!(
        deactivated.reason.as_deref(),
        Some("frame error budget exhausted")
    );
    // Bad frames are not a disconnection: the device stayed attached, so no
    // disconnect is reported and the render target is left as-is.
    assert!(seen.iter().all(|ev| ev.kind != EventKind::StreamDisconnected));
    assert!(!render.cleared().contains(&0));
    assert_eq!(ctrl.active_count().await, 0);

    // Auto-management is off and the device set never changed, so nothing
    // restarts the stream.
    time::sleep(Duration::from_secs(10)).await;
    assert!(drain_events(&mut rx)
        .iter()
        .all(|ev| ev.kind != EventKind::StreamDisconnected));
    assert_eq!(ctrl.active_count().await, 0);
    assert_eq!(plugin.start_calls("camA"), 1);

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn auto_management_recovers_exhausted_slot() {
    let plugin = Arc::new(FakePlugin::new(&["camA"]));
    plugin.frame_mode("camA", FrameMode::Empty);
    let render = Arc::new(FakeRender::default());
    let cfg = Config {
        auto_detect: false,
        ..Config::default()
    };
    let ctrl = Controller::builder(cfg, plugin.clone(), render).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();
    wait_for(&mut rx, EventKind::SlotDeactivated).await;

    // Heal the device, then turn auto-management on at runtime.
    plugin.frame_mode("camA", FrameMode::Frames);
    ctrl.set_detection_interval(Duration::from_millis(100)).await; // clamped to 500ms
    ctrl.set_auto_detect(true).await;

    let activated = wait_for(&mut rx, EventKind::SlotActivated).await;
    assert_eq!(activated.device.as_deref(), Some("camA"));
    assert_eq!(ctrl.active_count().await, 1);
    assert_eq!(plugin.start_calls("camA"), 2);

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn swap_exchanges_bindings_between_active_slots() {
    let plugin = Arc::new(FakePlugin::new(&["camA", "camB"]));
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin, render.clone()).build();

    ctrl.start().await.unwrap();

    assert!(ctrl.swap_slots(0, 1).await);

    let slots = ctrl.slots().await;
    assert_eq!(slots[0].device_id.as_deref(), Some("camB"));
    assert_eq!(slots[1].device_id.as_deref(), Some("camA"));
    assert!(slots[0].active && slots[1].active);

    // Both relaunched loops keep pumping against the exchanged targets.
    let before = (render.presented_count(0), render.presented_count(1));
    time::sleep(Duration::from_secs(1)).await;
    assert!(render.presented_count(0) > before.0);
    assert!(render.presented_count(1) > before.1);

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn swap_rejects_invalid_or_inactive_slots() {
    let plugin = Arc::new(FakePlugin::new(&["camA"]));
    let render = Arc::new(FakeRender::default());
    let cfg = Config {
        auto_detect: false,
        ..Config::default()
    };
    let ctrl = Controller::builder(cfg, plugin, render).build();

    ctrl.start().await.unwrap();

    assert!(!ctrl.swap_slots(0, 0).await);
    assert!(!ctrl.swap_slots(0, 5).await);
    // Slot 1 never activated (only one device attached).
    assert!(!ctrl.swap_slots(0, 1).await);

    let slots = ctrl.slots().await;
    assert_eq!(slots[0].device_id.as_deref(), Some("camA"));
    assert!(slots[0].active);

    ctrl.stop().await.unwrap();
}
