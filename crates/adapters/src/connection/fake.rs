// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake connector for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ConnectionError, Connector};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded connector call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCall {
    Attach { worker: String },
    Detach { worker: String, session: String },
}

#[derive(Default)]
struct FakeState {
    calls: Vec<ConnectionCall>,
    /// worker -> session id
    attached: HashMap<String, String>,
    attach_failures: VecDeque<String>,
    attach_delay: Option<Duration>,
    double_attaches: usize,
    next_id: u64,
}

/// Fake connector for testing
///
/// Tracks which workers hold a session. Attaching a worker that already
/// holds one is counted in [`double_attaches`](Self::double_attaches).
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<ConnectionCall> {
        self.lock().calls.clone()
    }

    pub fn is_attached(&self, worker: &str) -> bool {
        self.lock().attached.contains_key(worker)
    }

    pub fn attach_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ConnectionCall::Attach { .. }))
            .count()
    }

    pub fn detach_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ConnectionCall::Detach { .. }))
            .count()
    }

    pub fn double_attaches(&self) -> usize {
        self.lock().double_attaches
    }

    pub fn fail_next_attach(&self, reason: impl Into<String>) {
        self.lock().attach_failures.push_back(reason.into());
    }

    /// Delay attaches, simulating a worker slow to connect back
    pub fn set_attach_delay(&self, delay: Duration) {
        self.lock().attach_delay = Some(delay);
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn attach(&self, worker: &str) -> Result<String, ConnectionError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(ConnectionCall::Attach {
                worker: worker.to_string(),
            });
            state.attach_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(reason) = state.attach_failures.pop_front() {
            return Err(ConnectionError::AttachFailed(reason));
        }
        if state.attached.contains_key(worker) {
            state.double_attaches += 1;
        }
        state.next_id += 1;
        let id = format!("session-{}", state.next_id);
        state.attached.insert(worker.to_string(), id.clone());
        Ok(id)
    }

    async fn detach(&self, worker: &str, session: &str) -> Result<(), ConnectionError> {
        let mut state = self.lock();
        state.calls.push(ConnectionCall::Detach {
            worker: worker.to_string(),
            session: session.to_string(),
        });
        match state.attached.get(worker) {
            Some(id) if id == session => {
                state.attached.remove(worker);
                Ok(())
            }
            _ => Err(ConnectionError::NotFound(session.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
