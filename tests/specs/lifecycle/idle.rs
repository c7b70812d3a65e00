//! Idle teardown specs
//!
//! The last build out arms the timer; the next build in cancels it.

use crate::prelude::*;

fn idle_after(secs: u64) -> Scenario {
    Scenario::with_config(
        WorkerConfig::new("w1")
            .with_build_wait_timeout(IdleTimeout::After(Duration::from_secs(secs))),
    )
}

#[tokio::test(start_paused = true)]
async fn teardown_fires_no_earlier_than_timeout() {
    let s = idle_after(120);
    s.substantiate("a").await.unwrap();
    s.worker.bind_kind(kind("a").as_ref()).unwrap();
    s.worker.unbind_build();

    tokio::time::sleep(Duration::from_secs(119)).await;
    settle().await;
    s.assert_state(WorkerState::Started, "a");

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    s.assert_state(WorkerState::Stopped, "");
    assert_eq!(s.provisioner.stop_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn new_build_cancels_pending_teardown() {
    let s = idle_after(120);
    s.substantiate("a").await.unwrap();
    s.worker.bind_kind(kind("a").as_ref()).unwrap();
    s.worker.unbind_build();

    tokio::time::sleep(Duration::from_secs(60)).await;
    s.worker.bind_kind(kind("a").as_ref()).unwrap();

    tokio::time::sleep(Duration::from_secs(3600)).await;
    settle().await;
    s.assert_state(WorkerState::Started, "a");
    assert_eq!(s.provisioner.stop_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn timer_restarts_from_the_latest_unbind() {
    let s = idle_after(120);
    s.substantiate("a").await.unwrap();
    s.worker.bind_kind(kind("a").as_ref()).unwrap();
    s.worker.unbind_build();

    tokio::time::sleep(Duration::from_secs(100)).await;
    s.worker.bind_kind(kind("a").as_ref()).unwrap();
    s.worker.unbind_build();

    // 200s after the first unbind, only 100s after the second
    tokio::time::sleep(Duration::from_secs(100)).await;
    settle().await;
    s.assert_state(WorkerState::Started, "a");

    tokio::time::sleep(Duration::from_secs(21)).await;
    settle().await;
    s.assert_state(WorkerState::Stopped, "");
}

#[tokio::test(start_paused = true)]
async fn worker_without_builds_is_not_torn_down() {
    let s = idle_after(1);
    s.substantiate("a").await.unwrap();

    // Never bound, so the timer was never armed
    tokio::time::sleep(Duration::from_secs(3600)).await;
    settle().await;
    s.assert_state(WorkerState::Started, "a");
}
