//! Contract: deterministic shutdown
//!
//! Shutdown stops new ticks, lets an in-flight attempt finish and get
//! logged, then flushes the log exactly once.

mod common;

use common::{CountingProvider, CallTracker, scheduler_with, shutdown_after};
use dnsync_core::{MemorySyncLog, SyncStatus};
use std::time::Duration;
use tokio::sync::oneshot;

#[tokio::test(start_paused = true)]
async fn test_in_flight_attempt_is_awaited() {
    let tracker = CallTracker::new();
    let log = MemorySyncLog::new();
    let provider = CountingProvider::new(tracker.clone()).with_delay(Duration::from_secs(5));
    let scheduler = scheduler_with(Box::new(provider), Duration::from_secs(60), &log);

    // Shutdown fires 1s into a 5s attempt.
    let ticks = scheduler
        .run_until(shutdown_after(Duration::from_secs(1)))
        .await
        .unwrap();

    assert_eq!(ticks, 1);
    assert_eq!(tracker.calls(), 1);
    assert_eq!(tracker.completed(), 1);
    assert_eq!(log.count(SyncStatus::Success), 1);
    assert_eq!(log.flush_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ready_shutdown_runs_no_attempt() {
    let tracker = CallTracker::new();
    let log = MemorySyncLog::new();
    let scheduler = scheduler_with(
        Box::new(CountingProvider::new(tracker.clone())),
        Duration::from_secs(10),
        &log,
    );

    let ticks = scheduler.run_until(std::future::ready(())).await.unwrap();

    assert_eq!(ticks, 0);
    assert_eq!(tracker.calls(), 0);
    assert!(log.is_empty());
    assert_eq!(log.flush_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_from_another_task() {
    let tracker = CallTracker::new();
    let log = MemorySyncLog::new();
    let scheduler = scheduler_with(
        Box::new(CountingProvider::new(tracker.clone())),
        Duration::from_secs(10),
        &log,
    );

    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        scheduler
            .run_until(async {
                let _ = rx.await;
            })
            .await
    });

    tokio::time::sleep(Duration::from_secs(15)).await;
    tx.send(()).unwrap();

    let ticks = handle.await.unwrap().unwrap();

    // Ticks at 0s and 10s, nothing after the signal at 15s.
    assert_eq!(ticks, 2);
    assert_eq!(tracker.calls(), 2);
    assert_eq!(log.len(), 2);
    assert_eq!(log.flush_count(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(tracker.calls(), 2);
}
