// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Latent worker lifecycle states
//!
//! ```text
//!            substantiate              provision ok
//!  STOPPED ───────────────▶ STARTING ───────────────▶ STARTED
//!     ▲  ▲                     │                        │  │
//!     │  └─────────────────────┘                        │  │
//!     │      provision failed            insubstantiate │  │ crashed
//!     │                                                 ▼  │
//!     └──────────────────────────────────────────── STOPPING
//!     ▲             stop ok / stop failed (degraded)       │
//!     └────────────────────────────────────────────────────┘
//! ```
//!
//! The crash edge (STARTED → STOPPED) bypasses STOPPING because the backing
//! resource is presumed gone. There is no STOPPING → STARTING edge: a start
//! requested while stopping waits for STOPPED.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a latent worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// No backing resource exists
    #[default]
    Stopped,
    /// A provisioning start is in flight
    Starting,
    /// The resource is up and may run builds
    Started,
    /// A provisioning stop is in flight
    Stopping,
}

impl WorkerState {
    pub const ALL: [WorkerState; 4] = [
        WorkerState::Stopped,
        WorkerState::Starting,
        WorkerState::Started,
        WorkerState::Stopping,
    ];

    /// Whether `self -> to` is one of the defined lifecycle edges
    pub fn can_transition_to(self, to: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, to),
            (Stopped, Starting)
                | (Starting, Started)
                | (Starting, Stopped)
                | (Started, Stopping)
                | (Started, Stopped)
                | (Stopping, Stopped)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Stopped => "stopped",
            WorkerState::Starting => "starting",
            WorkerState::Started => "started",
            WorkerState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
