//! Shared harness for lifecycle specs

pub use lw_adapters::{Completion, FakeConnector, FakeProvisioner, ProvisionCall, ProvisionError};
pub use lw_core::{HealthStatus, IdleTimeout, Kind, WorkerConfig, WorkerEvent, WorkerState};
pub use lw_engine::{LatentWorker, WorkerError};
pub use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

pub type Worker = LatentWorker<FakeProvisioner, FakeConnector>;

/// `""` requests no particular kind
pub fn kind(name: &str) -> Option<Kind> {
    (!name.is_empty()).then(|| Kind::new(name))
}

/// Let spawned operation tasks run to their next suspension point
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// One worker "w1" wired to fake adapters, with its events recorded
pub struct Scenario {
    pub worker: Worker,
    pub provisioner: FakeProvisioner,
    pub connector: FakeConnector,
    events: UnboundedReceiver<WorkerEvent>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::with_config(WorkerConfig::new("w1"))
    }

    pub fn with_config(config: WorkerConfig) -> Self {
        let provisioner = FakeProvisioner::new();
        let connector = FakeConnector::new();
        let worker = LatentWorker::new(config, provisioner.clone(), connector.clone());
        let events = worker.subscribe();
        Self {
            worker,
            provisioner,
            connector,
            events,
        }
    }

    pub async fn substantiate(&self, name: &str) -> Result<(), WorkerError> {
        self.worker.substantiate_kind(kind(name)).await
    }

    pub fn spawn_substantiate(&self, name: &str) -> JoinHandle<Result<(), WorkerError>> {
        let worker = self.worker.clone();
        let requested = kind(name);
        tokio::spawn(async move { worker.substantiate_kind(requested).await })
    }

    pub fn spawn_insubstantiate(&self) -> JoinHandle<Result<(), WorkerError>> {
        let worker = self.worker.clone();
        tokio::spawn(async move { worker.insubstantiate().await })
    }

    /// Events published since the last call
    pub fn events(&mut self) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn event_names(&mut self) -> Vec<String> {
        self.events().iter().map(WorkerEvent::name).collect()
    }

    pub fn assert_state(&self, state: WorkerState, name: &str) {
        assert_eq!(self.worker.state(), state, "worker state");
        assert_eq!(self.worker.current_kind(), kind(name), "worker kind");
    }
}
