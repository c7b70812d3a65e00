//! Kind compatibility specs
//!
//! Same kind reuses the running resource; another kind restarts it once.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn same_kind_resolves_without_adapter_call() {
    let s = Scenario::new();

    s.substantiate("a").await.unwrap();
    s.assert_state(WorkerState::Started, "a");

    s.substantiate("a").await.unwrap();
    assert_eq!(s.provisioner.start_count(), 1);
    assert_eq!(s.provisioner.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn other_kind_stops_once_then_starts_once() {
    let mut s = Scenario::new();
    s.substantiate("a").await.unwrap();
    s.events();

    s.substantiate("b").await.unwrap();

    assert_eq!(
        s.provisioner.calls(),
        vec![
            ProvisionCall::Start {
                worker: "w1".to_string(),
                kind: kind("a"),
            },
            ProvisionCall::Stop {
                worker: "w1".to_string(),
                fast: false,
            },
            ProvisionCall::Start {
                worker: "w1".to_string(),
                kind: kind("b"),
            },
        ]
    );
    s.assert_state(WorkerState::Started, "b");
    assert_eq!(
        s.event_names(),
        vec![
            "worker:stopping",
            "worker:stopped",
            "worker:starting",
            "worker:started",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn overlapping_requests_for_two_kinds_settle_on_the_last() {
    let s = Scenario::new();
    s.provisioner.set_start_completion(Completion::Held);

    let first = s.spawn_substantiate("a");
    settle().await;
    let second = s.spawn_substantiate("b");
    settle().await;

    s.provisioner.set_start_completion(Completion::Immediate);
    assert_eq!(first.await.unwrap(), Ok(()));
    assert_eq!(second.await.unwrap(), Ok(()));

    assert_eq!(s.provisioner.started_kinds(), vec![kind("a"), kind("b")]);
    assert_eq!(s.provisioner.stop_count(), 1);
    s.assert_state(WorkerState::Started, "b");
}

#[tokio::test(start_paused = true)]
async fn stopped_worker_accepts_any_kind() {
    let s = Scenario::new();
    s.substantiate("a").await.unwrap();
    s.worker.insubstantiate().await.unwrap();

    s.substantiate("b").await.unwrap();

    assert_eq!(s.provisioner.started_kinds(), vec![kind("a"), kind("b")]);
    assert_eq!(s.provisioner.stop_count(), 1);
}
