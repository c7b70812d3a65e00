// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux-hosted worker connections
//!
//! Each worker's `connect` command (typically an ssh invocation starting the
//! remote build agent) runs inside a detached tmux session named
//! `lw-<worker>`. Detaching kills the session.

use super::{ConnectionError, Connector};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::process::Command;

/// Connector running each worker's connect command in a tmux session
#[derive(Clone, Default)]
pub struct TmuxConnector {
    connect_commands: Arc<HashMap<String, String>>,
}

impl TmuxConnector {
    pub fn new(connect_commands: HashMap<String, String>) -> Self {
        Self {
            connect_commands: Arc::new(connect_commands),
        }
    }

    pub fn session_name(worker: &str) -> String {
        format!("lw-{}", worker)
    }
}

#[async_trait]
impl Connector for TmuxConnector {
    async fn attach(&self, worker: &str) -> Result<String, ConnectionError> {
        let session_id = Self::session_name(worker);
        let Some(cmd) = self.connect_commands.get(worker) else {
            return Err(ConnectionError::AttachFailed(format!(
                "no connect command for {}",
                worker
            )));
        };

        // A leftover session belongs to a previous incarnation of the resource
        let existing = Command::new("tmux")
            .args(["has-session", "-t", &session_id])
            .output()
            .await;

        if existing.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(session_id, "session already exists, killing first");
            let _ = Command::new("tmux")
                .args(["kill-session", "-t", &session_id])
                .output()
                .await;
        }

        let output = Command::new("tmux")
            .arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(&session_id)
            .arg("-e")
            .arg(format!("LW_WORKER={}", worker))
            .arg(cmd)
            .output()
            .await
            .map_err(|e| ConnectionError::AttachFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConnectionError::AttachFailed(stderr.trim().to_string()));
        }

        Ok(session_id)
    }

    async fn detach(&self, _worker: &str, session: &str) -> Result<(), ConnectionError> {
        let output = Command::new("tmux")
            .arg("kill-session")
            .arg("-t")
            .arg(session)
            .output()
            .await
            .map_err(|e| ConnectionError::DetachFailed(e.to_string()))?;

        if !output.status.success() {
            // Session might already be dead, which is fine
            tracing::debug!(session, "kill-session reported no such session");
        }

        Ok(())
    }
}
