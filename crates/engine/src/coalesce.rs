// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request coalescing
//!
//! One in-flight operation per direction. The first caller opens the
//! operation and everyone arriving before it resolves follows, receiving a
//! clone of the same outcome. Waiters are released in
//! arrival order, each exactly once.
//!
//! The coalescer holds no lock of its own: it lives inside the worker's state
//! so that opening an operation and changing state happen atomically.

use tokio::sync::oneshot;

/// Single pending-operation slot with ordered waiter fan-out
#[derive(Debug)]
pub struct Coalescer<T> {
    waiters: Option<Vec<oneshot::Sender<T>>>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self { waiters: None }
    }
}

impl<T: Clone> Coalescer<T> {
    pub fn new() -> Self {
        Self { waiters: None }
    }

    pub fn is_pending(&self) -> bool {
        self.waiters.is_some()
    }

    /// Follow the in-flight operation, or open a new one
    pub fn join(&mut self) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        self.waiters.get_or_insert_with(Vec::new).push(tx);
        rx
    }

    /// Follow the in-flight operation; `None` if nothing is pending
    pub fn follow(&mut self) -> Option<oneshot::Receiver<T>> {
        let waiters = self.waiters.as_mut()?;
        let (tx, rx) = oneshot::channel();
        waiters.push(tx);
        Some(rx)
    }

    /// Deliver the outcome to every waiter in arrival order and close the
    /// operation. Returns how many waiters were still listening.
    pub fn resolve(&mut self, outcome: T) -> usize {
        let Some(waiters) = self.waiters.take() else {
            return 0;
        };
        let mut delivered = 0;
        for tx in waiters {
            // A receiver dropped by a cancelled caller is not an error
            if tx.send(outcome.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
#[path = "coalesce_tests.rs"]
mod tests;
