// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The set of latent workers managed together

use crate::error::{FleetError, WorkerError};
use crate::worker::LatentWorker;
use lw_adapters::{Connector, Provisioner};
use lw_core::{HealthStatus, WorkerConfig, WorkerStatus};
use std::collections::BTreeMap;
use tokio::task::JoinSet;

/// Workers keyed by unique name
pub struct Fleet<P, C> {
    workers: BTreeMap<String, LatentWorker<P, C>>,
}

impl<P, C> Default for Fleet<P, C> {
    fn default() -> Self {
        Self {
            workers: BTreeMap::new(),
        }
    }
}

impl<P: Provisioner, C: Connector> Fleet<P, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one worker per config, all sharing the same adapters
    pub fn from_configs(
        configs: Vec<WorkerConfig>,
        provisioner: P,
        connector: C,
    ) -> Result<Self, FleetError> {
        let mut fleet = Self::new();
        for config in configs {
            fleet.insert(LatentWorker::new(
                config,
                provisioner.clone(),
                connector.clone(),
            ))?;
        }
        Ok(fleet)
    }

    pub fn insert(&mut self, worker: LatentWorker<P, C>) -> Result<(), FleetError> {
        let name = worker.name().to_string();
        if self.workers.contains_key(&name) {
            return Err(FleetError::DuplicateWorker(name));
        }
        self.workers.insert(name, worker);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&LatentWorker<P, C>> {
        self.workers.get(name)
    }

    /// Like [`get`](Self::get), for callers that report unknown names
    pub fn worker(&self, name: &str) -> Result<&LatentWorker<P, C>, FleetError> {
        self.workers
            .get(name)
            .ok_or_else(|| FleetError::UnknownWorker(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LatentWorker<P, C>> {
        self.workers.values()
    }

    pub fn statuses(&self) -> Vec<WorkerStatus> {
        self.workers.values().map(LatentWorker::status).collect()
    }

    /// Probe every worker concurrently. Results are in name order.
    pub async fn check_health_all(&self) -> Vec<(String, HealthStatus)> {
        Self::probe(self.workers.values()).await
    }

    /// Probe only running workers. A resource that is still booting or
    /// attaching routinely fails its health command, so it is left alone.
    pub async fn poll_health(&self) -> Vec<(String, HealthStatus)> {
        Self::probe(self.workers.values().filter(|w| w.is_running())).await
    }

    async fn probe<'a>(
        workers: impl Iterator<Item = &'a LatentWorker<P, C>>,
    ) -> Vec<(String, HealthStatus)> {
        let mut probes = JoinSet::new();
        for worker in workers {
            let worker = worker.clone();
            probes.spawn(async move {
                let health = worker.check_health().await;
                (worker.name().to_string(), health)
            });
        }

        let mut report = Vec::with_capacity(probes.len());
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(entry) => report.push(entry),
                Err(e) => tracing::error!(error = %e, "health probe task failed"),
            }
        }
        report.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }

    /// Fast-insubstantiate every worker. Returns the workers whose stop
    /// reported a failure; all of them still end STOPPED.
    pub async fn shutdown_all(&self) -> Vec<(String, WorkerError)> {
        let mut stops = JoinSet::new();
        for worker in self.workers.values() {
            let worker = worker.clone();
            stops.spawn(async move {
                let result = worker.insubstantiate_fast().await;
                (worker.name().to_string(), result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = stops.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(e))) => {
                    tracing::warn!(worker = %name, error = %e, "stop failed during shutdown");
                    failures.push((name, e));
                }
                Err(e) => tracing::error!(error = %e, "stop task failed"),
            }
        }
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        failures
    }
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
