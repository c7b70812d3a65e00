// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot of a worker for the reporting layer

use crate::health::HealthStatus;
use crate::kind::Kind;
use crate::state::WorkerState;
use serde::{Deserialize, Serialize};

/// Point-in-time view of a latent worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub name: String,
    pub state: WorkerState,
    /// Kind being started or running; retained until STOPPED
    pub kind: Option<Kind>,
    /// Builds currently bound to the worker
    pub builds: usize,
    /// The last stop was forced by a failed health check
    pub crashed: bool,
    pub last_health: Option<HealthStatus>,
    pub idle_timer_armed: bool,
}
