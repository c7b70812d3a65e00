//! Health specs
//!
//! An unhealthy probe while started is an unexpected stop.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn unhealthy_probe_forces_stopped_and_detaches() {
    let mut s = Scenario::new();
    s.substantiate("a").await.unwrap();
    assert!(s.connector.is_attached("w1"));
    s.events();

    s.provisioner
        .set_health(HealthStatus::unhealthy("instance terminated"));
    let health = s.worker.check_health().await;

    assert!(!health.is_healthy());
    s.assert_state(WorkerState::Stopped, "");
    assert!(!s.connector.is_attached("w1"));
    // No graceful stop for a resource that is already gone
    assert_eq!(s.provisioner.stop_count(), 0);
    assert_eq!(s.event_names(), vec!["worker:anomaly", "worker:stopped"]);
}

#[tokio::test(start_paused = true)]
async fn crash_while_starting_fails_the_start() {
    let s = Scenario::new();
    s.provisioner.set_start_completion(Completion::Held);
    let start = s.spawn_substantiate("a");
    settle().await;

    s.provisioner.set_health(HealthStatus::unhealthy("boot failure"));
    s.worker.check_health().await;
    s.provisioner.complete_start(Ok(()));

    assert!(matches!(
        start.await.unwrap(),
        Err(WorkerError::HealthCheckFailed(_))
    ));
    s.assert_state(WorkerState::Stopped, "");
    assert_eq!(s.provisioner.stop_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn crash_while_stopping_completes_the_stop() {
    let s = Scenario::new();
    s.substantiate("a").await.unwrap();
    s.provisioner.set_stop_completion(Completion::Held);
    let stop = s.spawn_insubstantiate();
    settle().await;

    s.provisioner.set_health(HealthStatus::unhealthy("gone"));
    s.worker.check_health().await;
    s.provisioner
        .complete_stop(Err(ProvisionError::StopFailed("instance not found".to_string())));

    assert_eq!(stop.await.unwrap(), Ok(()));
    s.assert_state(WorkerState::Stopped, "");
}

#[tokio::test(start_paused = true)]
async fn worker_restarts_after_crash() {
    let s = Scenario::new();
    s.substantiate("a").await.unwrap();
    s.provisioner.set_health(HealthStatus::unhealthy("oom"));
    s.worker.check_health().await;
    s.provisioner.set_health(HealthStatus::Healthy);

    s.substantiate("a").await.unwrap();

    s.assert_state(WorkerState::Started, "a");
    assert_eq!(s.provisioner.start_count(), 2);
    assert!(!s.worker.status().crashed);
}
