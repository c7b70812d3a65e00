//! Failure specs
//!
//! Adapter failures become state transitions plus a reported outcome.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn start_failure_returns_to_stopped_for_every_waiter() {
    let s = Scenario::new();
    s.provisioner.set_start_completion(Completion::Held);

    let waiters: Vec<_> = (0..3).map(|_| s.spawn_substantiate("a")).collect();
    settle().await;
    s.provisioner
        .complete_start(Err(ProvisionError::StartFailed("image missing".to_string())));

    for waiter in waiters {
        assert!(matches!(
            waiter.await.unwrap(),
            Err(WorkerError::ProvisionStartFailed(_))
        ));
    }
    s.assert_state(WorkerState::Stopped, "");
}

#[tokio::test(start_paused = true)]
async fn start_failure_is_not_retried() {
    let s = Scenario::new();
    s.provisioner.fail_next_start("image missing");

    assert!(s.substantiate("a").await.is_err());
    assert_eq!(s.provisioner.start_count(), 1);

    // The caller decides to retry, possibly with another kind
    s.substantiate("b").await.unwrap();
    s.assert_state(WorkerState::Started, "b");
}

#[tokio::test(start_paused = true)]
async fn stop_failure_is_absorbed_and_reported() {
    let mut s = Scenario::new();
    s.substantiate("a").await.unwrap();
    s.events();
    s.provisioner.fail_next_stop("api timeout");

    let result = s.worker.insubstantiate().await;

    assert!(matches!(result, Err(WorkerError::ProvisionStopFailed(_))));
    s.assert_state(WorkerState::Stopped, "");
    let anomalies: Vec<_> = s
        .events()
        .into_iter()
        .filter(|e| matches!(e, WorkerEvent::Anomaly { .. }))
        .collect();
    assert_eq!(anomalies.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_that_never_attaches_tears_resource_down_fast() {
    let s = Scenario::new();
    s.connector.fail_next_attach("agent did not call back");

    let result = s.substantiate("a").await;

    assert!(matches!(result, Err(WorkerError::ProvisionStartFailed(_))));
    assert_eq!(
        s.provisioner.calls().last(),
        Some(&ProvisionCall::Stop {
            worker: "w1".to_string(),
            fast: true,
        })
    );
    s.assert_state(WorkerState::Stopped, "");
}

#[tokio::test(start_paused = true)]
async fn caller_timing_out_still_gets_state_reconciled() {
    let s = Scenario::new();
    s.provisioner.set_start_completion(Completion::Held);

    let gave_up =
        tokio::time::timeout(Duration::from_secs(1), s.worker.substantiate_kind(kind("a"))).await;
    assert!(gave_up.is_err());

    s.provisioner.complete_start(Ok(()));
    settle().await;
    s.assert_state(WorkerState::Started, "a");

    // The next caller sees the real outcome
    s.substantiate("a").await.unwrap();
    assert_eq!(s.provisioner.start_count(), 1);
}
