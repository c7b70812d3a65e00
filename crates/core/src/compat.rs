// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compatibility resolver
//!
//! Decides whether a requested kind can use the worker as it currently
//! stands. A mismatch is never a rejection: it is resolved by a full
//! stop/start cycle. Whether a restart is worth paying for is a scheduling
//! decision made elsewhere.

use crate::kind::Kind;
use crate::state::WorkerState;

/// Outcome of comparing a requested kind with the worker's current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Nothing is provisioned; begin a start cycle
    ProceedStart,
    /// The current (or in-flight) resource already satisfies the request
    Reuse,
    /// The resource must be stopped and started again with the requested kind
    RequiresRestart,
    /// A stop is in flight; wait for STOPPED, then start
    AwaitStopped,
}

/// Resolve the requested kind against the worker's state.
///
/// `current` is the kind the worker was started (or is starting) with.
/// Two absent kinds compare equal.
pub fn resolve(
    state: WorkerState,
    current: Option<&Kind>,
    requested: Option<&Kind>,
) -> Compatibility {
    match state {
        WorkerState::Stopped => Compatibility::ProceedStart,
        WorkerState::Stopping => Compatibility::AwaitStopped,
        WorkerState::Starting | WorkerState::Started => {
            if current == requested {
                Compatibility::Reuse
            } else {
                Compatibility::RequiresRestart
            }
        }
    }
}

#[cfg(test)]
#[path = "compat_tests.rs"]
mod tests;
