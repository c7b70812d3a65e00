//! State edge specs
//!
//! Arbitrary interleavings of requests, failures, crashes and idle expiry
//! only ever walk the defined lifecycle edges and never wedge the worker.

use crate::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Substantiate(&'static str),
    Insubstantiate,
    FastInsubstantiate,
    Crash,
    FailNextStart,
    FailNextStop,
    FailNextAttach,
    Bind,
    Unbind,
    Wait(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::sample::select(vec!["", "a", "b"]).prop_map(Op::Substantiate),
        2 => Just(Op::Insubstantiate),
        1 => Just(Op::FastInsubstantiate),
        1 => Just(Op::Crash),
        1 => Just(Op::FailNextStart),
        1 => Just(Op::FailNextStop),
        1 => Just(Op::FailNextAttach),
        2 => Just(Op::Bind),
        2 => Just(Op::Unbind),
        2 => (0u64..90).prop_map(Op::Wait),
    ]
}

async fn run(ops: Vec<Op>) {
    let config = WorkerConfig::new("w1")
        .with_build_wait_timeout(IdleTimeout::After(Duration::from_secs(30)));
    let mut s = Scenario::with_config(config);
    s.provisioner.set_start_delay(Duration::from_secs(5));

    let mut pending = Vec::new();
    for op in ops {
        match op {
            Op::Substantiate(name) => pending.push(s.spawn_substantiate(name)),
            Op::Insubstantiate => pending.push(s.spawn_insubstantiate()),
            Op::FastInsubstantiate => {
                let worker = s.worker.clone();
                pending.push(tokio::spawn(async move { worker.insubstantiate_fast().await }));
            }
            Op::Crash => {
                s.provisioner.set_health(HealthStatus::unhealthy("crashed"));
                s.worker.check_health().await;
                s.provisioner.set_health(HealthStatus::Healthy);
            }
            Op::FailNextStart => s.provisioner.fail_next_start("rejected"),
            Op::FailNextStop => s.provisioner.fail_next_stop("rejected"),
            Op::FailNextAttach => s.connector.fail_next_attach("refused"),
            Op::Bind => {
                let current = s.worker.current_kind();
                let _ = s.worker.bind_kind(current.as_ref());
            }
            Op::Unbind => s.worker.unbind_build(),
            Op::Wait(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        }
        settle().await;
    }

    // Every request resolves
    for handle in pending {
        let joined = tokio::time::timeout(Duration::from_secs(3600), handle).await;
        assert!(joined.is_ok(), "request never resolved");
    }
    settle().await;

    let mut at = WorkerState::Stopped;
    for event in s.events() {
        if let WorkerEvent::StateChanged { from, to, .. } = event {
            assert_eq!(from, at, "event chain broken");
            assert!(from.can_transition_to(to), "undefined edge {} -> {}", from, to);
            at = to;
        }
    }
    assert_eq!(at, s.worker.state());

    assert_eq!(s.connector.double_attaches(), 0);
    if s.worker.state() == WorkerState::Stopped {
        assert!(!s.connector.is_attached("w1"), "session outlived the resource");
        assert_eq!(s.worker.current_kind(), None);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn interleavings_only_walk_defined_edges(ops in prop::collection::vec(op(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        runtime.block_on(run(ops));
    }
}
