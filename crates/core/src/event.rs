// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events published to the reporting layer

use crate::kind::Kind;
use crate::state::WorkerState;
use serde::{Deserialize, Serialize};

/// Something observable happened to a latent worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
    StateChanged {
        worker: String,
        from: WorkerState,
        to: WorkerState,
        kind: Option<Kind>,
    },
    /// A failure that was absorbed into a state transition
    Anomaly { worker: String, error: String },
    BuildBound { worker: String, running: usize },
    BuildUnbound { worker: String, running: usize },
}

impl WorkerEvent {
    /// Stable event name for filtering and logs
    pub fn name(&self) -> String {
        match self {
            WorkerEvent::StateChanged { to, .. } => format!("worker:{}", to),
            WorkerEvent::Anomaly { .. } => "worker:anomaly".to_string(),
            WorkerEvent::BuildBound { .. } => "build:bound".to_string(),
            WorkerEvent::BuildUnbound { .. } => "build:unbound".to_string(),
        }
    }

    pub fn worker(&self) -> &str {
        match self {
            WorkerEvent::StateChanged { worker, .. }
            | WorkerEvent::Anomaly { worker, .. }
            | WorkerEvent::BuildBound { worker, .. }
            | WorkerEvent::BuildUnbound { worker, .. } => worker,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
