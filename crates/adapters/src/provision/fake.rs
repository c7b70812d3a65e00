// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake provisioner for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ProvisionError, Provisioner};
use async_trait::async_trait;
use lw_core::{HealthStatus, Kind};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Recorded provisioner call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionCall {
    Start { worker: String, kind: Option<Kind> },
    Stop { worker: String, fast: bool },
    CheckHealth { worker: String },
}

/// When a start or stop call completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    /// Complete as soon as the call is made
    #[default]
    Immediate,
    /// Stay pending until the test completes it explicitly
    Held,
}

type Pending = oneshot::Sender<Result<(), ProvisionError>>;

#[derive(Default)]
struct FakeState {
    calls: Vec<ProvisionCall>,
    start_completion: Completion,
    stop_completion: Completion,
    start_failures: VecDeque<String>,
    stop_failures: VecDeque<String>,
    pending_starts: VecDeque<Pending>,
    pending_stops: VecDeque<Pending>,
    start_delay: Option<Duration>,
    health: Option<HealthStatus>,
}

/// Fake provisioner for testing
///
/// Starts and stops complete immediately unless the direction is switched to
/// [`Completion::Held`], in which case each call pends until
/// [`complete_start`](Self::complete_start) / [`complete_stop`](Self::complete_stop).
#[derive(Clone, Default)]
pub struct FakeProvisioner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProvisionCall> {
        self.lock().calls.clone()
    }

    pub fn start_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProvisionCall::Start { .. }))
            .count()
    }

    pub fn stop_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProvisionCall::Stop { .. }))
            .count()
    }

    /// Kinds passed to `start`, in call order
    pub fn started_kinds(&self) -> Vec<Option<Kind>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ProvisionCall::Start { kind, .. } => Some(kind.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_start_completion(&self, completion: Completion) {
        let pending = {
            let mut state = self.lock();
            state.start_completion = completion;
            match completion {
                Completion::Immediate => std::mem::take(&mut state.pending_starts),
                Completion::Held => VecDeque::new(),
            }
        };
        // Releasing a held direction lets waiting calls succeed
        for tx in pending {
            let _ = tx.send(Ok(()));
        }
    }

    pub fn set_stop_completion(&self, completion: Completion) {
        let pending = {
            let mut state = self.lock();
            state.stop_completion = completion;
            match completion {
                Completion::Immediate => std::mem::take(&mut state.pending_stops),
                Completion::Held => VecDeque::new(),
            }
        };
        for tx in pending {
            let _ = tx.send(Ok(()));
        }
    }

    /// Resolve the oldest held start. Returns false if none is pending.
    pub fn complete_start(&self, result: Result<(), ProvisionError>) -> bool {
        let tx = self.lock().pending_starts.pop_front();
        match tx {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Resolve the oldest held stop. Returns false if none is pending.
    pub fn complete_stop(&self, result: Result<(), ProvisionError>) -> bool {
        let tx = self.lock().pending_stops.pop_front();
        match tx {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    pub fn pending_starts(&self) -> usize {
        self.lock().pending_starts.len()
    }

    pub fn pending_stops(&self) -> usize {
        self.lock().pending_stops.len()
    }

    /// Make the next immediate start fail
    pub fn fail_next_start(&self, reason: impl Into<String>) {
        self.lock().start_failures.push_back(reason.into());
    }

    /// Make the next immediate stop fail
    pub fn fail_next_stop(&self, reason: impl Into<String>) {
        self.lock().stop_failures.push_back(reason.into());
    }

    /// Delay immediate starts, simulating a slow backend
    pub fn set_start_delay(&self, delay: Duration) {
        self.lock().start_delay = Some(delay);
    }

    pub fn set_health(&self, health: HealthStatus) {
        self.lock().health = Some(health);
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn start(&self, worker: &str, kind: Option<&Kind>) -> Result<(), ProvisionError> {
        let (rx, delay, immediate) = {
            let mut state = self.lock();
            state.calls.push(ProvisionCall::Start {
                worker: worker.to_string(),
                kind: kind.cloned(),
            });
            match state.start_completion {
                Completion::Held => {
                    let (tx, rx) = oneshot::channel();
                    state.pending_starts.push_back(tx);
                    (Some(rx), None, Ok(()))
                }
                Completion::Immediate => {
                    let result = match state.start_failures.pop_front() {
                        Some(reason) => Err(ProvisionError::StartFailed(reason)),
                        None => Ok(()),
                    };
                    (None, state.start_delay, result)
                }
            }
        };

        if let Some(rx) = rx {
            return rx
                .await
                .unwrap_or_else(|_| Err(ProvisionError::StartFailed("abandoned".to_string())));
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        immediate
    }

    async fn stop(&self, worker: &str, fast: bool) -> Result<(), ProvisionError> {
        let (rx, immediate) = {
            let mut state = self.lock();
            state.calls.push(ProvisionCall::Stop {
                worker: worker.to_string(),
                fast,
            });
            match state.stop_completion {
                Completion::Held => {
                    let (tx, rx) = oneshot::channel();
                    state.pending_stops.push_back(tx);
                    (Some(rx), Ok(()))
                }
                Completion::Immediate => {
                    let result = match state.stop_failures.pop_front() {
                        Some(reason) => Err(ProvisionError::StopFailed(reason)),
                        None => Ok(()),
                    };
                    (None, result)
                }
            }
        };

        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ProvisionError::StopFailed("abandoned".to_string()))),
            None => immediate,
        }
    }

    async fn check_health(&self, worker: &str) -> HealthStatus {
        let mut state = self.lock();
        state.calls.push(ProvisionCall::CheckHealth {
            worker: worker.to_string(),
        });
        state.health.clone().unwrap_or(HealthStatus::Healthy)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
