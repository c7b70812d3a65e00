// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioning backends
//!
//! A provisioner creates and destroys the compute resource behind a latent
//! worker. Implementations report failures as values; deciding what a
//! failure means for the worker's lifecycle is the caller's job.

mod command;

pub use command::CommandProvisioner;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{Completion, FakeProvisioner, ProvisionCall};

use async_trait::async_trait;
use lw_core::{HealthStatus, Kind};
use thiserror::Error;

/// Errors from provisioning operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("start failed: {0}")]
    StartFailed(String),
    #[error("stop failed: {0}")]
    StopFailed(String),
}

/// Backend that provisions the resource behind a latent worker
#[async_trait]
pub trait Provisioner: Clone + Send + Sync + 'static {
    /// Provision the resource for `worker` with the given kind.
    ///
    /// May take arbitrarily long. Callers run it on a task of its own.
    async fn start(&self, worker: &str, kind: Option<&Kind>) -> Result<(), ProvisionError>;

    /// Tear the resource down. `fast` skips graceful drain steps.
    async fn stop(&self, worker: &str, fast: bool) -> Result<(), ProvisionError>;

    /// Cheap point-in-time probe, safe to poll in any state
    async fn check_health(&self, worker: &str) -> HealthStatus;
}
