// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the lifecycle engine

use lw_core::{KindError, WorkerState};
use thiserror::Error;

/// Outcome of a lifecycle request that did not succeed.
///
/// Every provisioning failure is converted into a state transition before it
/// is reported here, so receiving one never leaves the worker stuck.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("provisioning start failed: {0}")]
    ProvisionStartFailed(String),
    /// Degraded: the worker still reached STOPPED
    #[error("provisioning stop failed: {0}")]
    ProvisionStopFailed(String),
    #[error("health check failed: {0}")]
    HealthCheckFailed(String),
    /// Not a failure: the build can bind once a restart cycle completes
    #[error("worker runs kind {current}, build needs {requested}: restart required")]
    IncompatibleKindPendingRestart { requested: String, current: String },
    #[error("worker is {state}, builds can only bind while started")]
    NotStarted { state: WorkerState },
    #[error(transparent)]
    KindRender(#[from] KindError),
    #[error("provisioning operation was abandoned")]
    Abandoned,
}

/// Errors managing the set of workers
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("duplicate worker name: {0}")]
    DuplicateWorker(String),
    #[error("unknown worker: {0}")]
    UnknownWorker(String),
}
