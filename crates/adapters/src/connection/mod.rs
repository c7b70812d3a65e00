// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live worker connections
//!
//! Once a resource is up, the connection layer attaches the session through
//! which builds run on it. The session is detached when the resource goes
//! down.

mod tmux;

pub use tmux::TmuxConnector;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ConnectionCall, FakeConnector};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from connection operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("attach failed: {0}")]
    AttachFailed(String),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("detach failed: {0}")]
    DetachFailed(String),
}

/// Adapter attaching and detaching live sessions to provisioned workers
#[async_trait]
pub trait Connector: Clone + Send + Sync + 'static {
    /// Resource is up: attach a session, returning its id
    async fn attach(&self, worker: &str) -> Result<String, ConnectionError>;

    /// Resource is going down: detach the session
    async fn detach(&self, worker: &str, session: &str) -> Result<(), ConnectionError>;
}
