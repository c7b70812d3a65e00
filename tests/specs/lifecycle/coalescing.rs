//! Coalescing specs
//!
//! Overlapping callers share one adapter call per lifecycle cycle.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn overlapping_substantiates_start_once() {
    let s = Scenario::new();
    s.provisioner.set_start_completion(Completion::Held);

    let waiters: Vec<_> = (0..5).map(|_| s.spawn_substantiate("a")).collect();
    settle().await;
    assert_eq!(s.provisioner.start_count(), 1);

    s.provisioner.complete_start(Ok(()));
    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }
    s.assert_state(WorkerState::Started, "a");
    assert_eq!(s.provisioner.start_count(), 1);
    assert_eq!(s.connector.attach_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn overlapping_insubstantiates_stop_once() {
    let s = Scenario::new();
    s.substantiate("a").await.unwrap();
    s.provisioner.set_stop_completion(Completion::Held);

    let waiters: Vec<_> = (0..5).map(|_| s.spawn_insubstantiate()).collect();
    settle().await;
    s.provisioner.complete_stop(Ok(()));

    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }
    assert_eq!(s.provisioner.stop_count(), 1);
    s.assert_state(WorkerState::Stopped, "");
}

#[tokio::test(start_paused = true)]
async fn all_waiters_observe_the_same_outcome() {
    let s = Scenario::new();
    s.provisioner.set_start_completion(Completion::Held);

    let waiters: Vec<_> = (0..4).map(|_| s.spawn_substantiate("a")).collect();
    settle().await;
    s.provisioner
        .complete_start(Err(ProvisionError::StartFailed("no capacity".to_string())));

    let mut outcomes = Vec::new();
    for waiter in waiters {
        outcomes.push(waiter.await.unwrap());
    }
    assert!(outcomes.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(matches!(outcomes[0], Err(WorkerError::ProvisionStartFailed(_))));
}

#[tokio::test(start_paused = true)]
async fn mixed_overlapping_requests_run_one_cycle_each_way() {
    let s = Scenario::new();
    s.provisioner.set_start_completion(Completion::Held);

    let starts: Vec<_> = (0..3).map(|_| s.spawn_substantiate("a")).collect();
    settle().await;
    let stops: Vec<_> = (0..3).map(|_| s.spawn_insubstantiate()).collect();
    settle().await;

    s.provisioner.set_start_completion(Completion::Immediate);
    for handle in starts.into_iter().chain(stops) {
        assert_eq!(handle.await.unwrap(), Ok(()));
    }

    assert_eq!(s.provisioner.start_count(), 1);
    assert_eq!(s.provisioner.stop_count(), 1);
    s.assert_state(WorkerState::Stopped, "");
}
