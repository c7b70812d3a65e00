// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle teardown timer
//!
//! Armed when the last build leaves a started worker, cancelled when a build
//! binds. Each arming gets a fresh token; an expiry only acts if its token is
//! still the armed one, so a timer that fires concurrently with a cancel is
//! ignored.

use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Decides whether an expired idle timer may tear the worker down
pub trait IdlePolicy: Send + Sync + 'static {
    /// Return `Some(delay)` to postpone teardown by `delay`
    fn defer(&self, uptime: Duration) -> Option<Duration>;
}

/// Tear down as soon as the timer expires
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysStop;

impl IdlePolicy for AlwaysStop {
    fn defer(&self, _uptime: Duration) -> Option<Duration> {
        None
    }
}

/// Keep the resource up for a minimum time after it started
#[derive(Debug, Clone, Copy)]
pub struct MinUptime(pub Duration);

impl IdlePolicy for MinUptime {
    fn defer(&self, uptime: Duration) -> Option<Duration> {
        self.0.checked_sub(uptime).filter(|rest| !rest.is_zero())
    }
}

/// One-shot timer with cancellation tokens
#[derive(Debug, Default)]
pub struct IdleTimer {
    armed: Option<(u64, AbortHandle)>,
    next_token: u64,
}

impl IdleTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer, replacing any armed one. `on_expire` receives the
    /// token, which must be passed to [`take_if_current`](Self::take_if_current).
    pub fn arm<F, Fut>(&mut self, after: Duration, on_expire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.next_token += 1;
        let token = self.next_token;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            on_expire(token).await;
        });
        self.armed = Some((token, handle.abort_handle()));
        token
    }

    /// Cancel the armed timer. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Claim an expiry. Disarms without aborting (the caller is the
    /// expiring task) and returns false if the token is stale.
    pub fn take_if_current(&mut self, token: u64) -> bool {
        match self.armed {
            Some((current, _)) if current == token => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "idle_tests.rs"]
mod tests;
