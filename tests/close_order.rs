//! Close-queue coverage: FIFO ordering, debounce, shutdown drain, and the
//! grace period.

mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use campool::{Config, Controller, EventKind, RuntimeError};
use support::{wait_for, FakePlugin, FakeRender};

#[tokio::test(start_paused = true)]
async fn closes_run_in_queue_order() {
    let plugin = Arc::new(FakePlugin::new(&["camA", "camB"]));
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin.clone(), render).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();
    assert_eq!(ctrl.active_count().await, 2);
    time::sleep(Duration::from_secs(1)).await;

    // Both devices vanish in one tick; cleanup vacates slot 0 before slot 1,
    // so the close queue holds camA then camB.
    plugin.set_devices(&[]);

    wait_for(&mut rx, EventKind::CloseCompleted).await;
    wait_for(&mut rx, EventKind::CloseCompleted).await;

    assert_eq!(
        plugin.closed_order(),
        vec!["camA".to_string(), "camB".to_string()]
    );
    assert_eq!(ctrl.active_count().await, 0);

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn close_is_debounced() {
    let plugin = Arc::new(FakePlugin::new(&["camA"]));
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin.clone(), render).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();
    time::sleep(Duration::from_secs(1)).await;
    plugin.detach("camA");

    wait_for(&mut rx, EventKind::CloseQueued).await;
    let queued_at = Instant::now();
    wait_for(&mut rx, EventKind::CloseCompleted).await;

    // The worker sits out the debounce window before touching the device.
    assert!(queued_at.elapsed() >= Duration::from_millis(300));

    ctrl.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_drains_queue_and_reports() {
    let plugin = Arc::new(FakePlugin::new(&["camA", "camB"]));
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin.clone(), render).build();
    let mut rx = ctrl.subscribe_events();

    ctrl.start().await.unwrap();
    assert_eq!(ctrl.active_count().await, 2);

    ctrl.stop().await.unwrap();

    wait_for(&mut rx, EventKind::ShutdownRequested).await;
    wait_for(&mut rx, EventKind::AllClosedWithin).await;

    let mut closed = plugin.closed_order();
    closed.sort();
    assert_eq!(closed, vec!["camA".to_string(), "camB".to_string()]);
    assert_eq!(ctrl.active_count().await, 0);
    assert!(!ctrl.is_running().await);
}

#[tokio::test(start_paused = true)]
async fn grace_exceeded_reports_pending_devices() {
    let plugin = Arc::new(FakePlugin::new(&["camA"]));
    plugin.hang_close("camA");
    let render = Arc::new(FakeRender::default());
    let ctrl = Controller::builder(Config::default(), plugin, render).build();

    ctrl.start().await.unwrap();
    assert_eq!(ctrl.active_count().await, 1);

    match ctrl.stop().await {
        Err(RuntimeError::GraceExceeded { grace, pending }) => {
            assert_eq!(grace, Duration::from_secs(10));
            assert_eq!(pending, vec!["camA".to_string()]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }

    // Stop is idempotent; the second call has nothing left to do.
    assert!(ctrl.stop().await.is_ok());
}
