// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::connection::{ConnectionError, Connector};
use crate::provision::{ProvisionError, Provisioner};
use async_trait::async_trait;
use lw_core::{HealthStatus, Kind};
use tracing::Instrument;

/// Wrapper that adds tracing to any Provisioner
#[derive(Clone)]
pub struct TracedProvisioner<P> {
    inner: P,
}

impl<P> TracedProvisioner<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: Provisioner> Provisioner for TracedProvisioner<P> {
    async fn start(&self, worker: &str, kind: Option<&Kind>) -> Result<(), ProvisionError> {
        let span = tracing::info_span!(
            "provision.start",
            worker,
            kind = kind.map(Kind::as_str).unwrap_or("-")
        );

        async {
            tracing::info!("starting");
            let start = std::time::Instant::now();
            let result = self.inner.start(worker, kind).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "provisioned"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "start failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn stop(&self, worker: &str, fast: bool) -> Result<(), ProvisionError> {
        let span = tracing::info_span!("provision.stop", worker, fast);

        async {
            tracing::info!("stopping");
            let start = std::time::Instant::now();
            let result = self.inner.stop(worker, fast).await;
            let elapsed = start.elapsed();

            // The worker still reaches STOPPED; this is reported, not fatal
            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "stopped"),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "stop failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn check_health(&self, worker: &str) -> HealthStatus {
        let status = self.inner.check_health(worker).await;
        match &status {
            HealthStatus::Healthy => tracing::trace!(worker, "healthy"),
            HealthStatus::Unhealthy { reason } => tracing::warn!(worker, reason, "unhealthy"),
        }
        status
    }
}

/// Wrapper that adds tracing to any Connector
#[derive(Clone)]
pub struct TracedConnector<C> {
    inner: C,
}

impl<C> TracedConnector<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Connector> Connector for TracedConnector<C> {
    async fn attach(&self, worker: &str) -> Result<String, ConnectionError> {
        let span = tracing::info_span!("connection.attach", worker);

        async {
            let start = std::time::Instant::now();
            let result = self.inner.attach(worker).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(session) => tracing::info!(
                    session,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "session attached"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "attach failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn detach(&self, worker: &str, session: &str) -> Result<(), ConnectionError> {
        let span = tracing::info_span!("connection.detach", worker, session);

        async {
            let result = self.inner.detach(worker, session).await;
            // detach() failing is often acceptable (session already gone)
            match &result {
                Ok(()) => tracing::info!("detached"),
                Err(e) => tracing::warn!(error = %e, "detach failed (may be expected)"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
