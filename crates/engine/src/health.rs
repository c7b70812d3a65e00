// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic health polling

use crate::fleet::Fleet;
use lw_adapters::{Connector, Provisioner};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Background task probing running workers at a fixed interval
pub struct HealthMonitor {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start polling. The first probe runs immediately.
    pub fn spawn<P: Provisioner, C: Connector>(fleet: Arc<Fleet<P, C>>, interval: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let interval = interval.max(MIN_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = fleet.poll_health().await;
                        let unhealthy = report.iter().filter(|(_, h)| !h.is_healthy()).count();
                        tracing::debug!(workers = report.len(), unhealthy, "health poll");
                    }
                    // Err means the monitor handle was dropped
                    _ = stop.changed() => break,
                }
            }
            tracing::debug!("health monitor stopped");
        });

        tracing::info!(interval_ms = interval.as_millis() as u64, "health monitor started");
        Self { shutdown, handle }
    }

    /// Stop polling and wait for an in-flight poll to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "health monitor task failed");
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
