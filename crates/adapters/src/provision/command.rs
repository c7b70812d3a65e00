// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell command provisioner
//!
//! Runs the commands configured for each worker through `sh -c`. The worker
//! name and requested kind are passed as `LW_WORKER` and `LW_KIND`. A worker
//! without a command for an operation treats that operation as a no-op.

use super::{ProvisionError, Provisioner};
use async_trait::async_trait;
use lw_core::{CommandSet, HealthStatus, Kind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::process::Command;

/// Provisioner driven by per-worker shell commands
#[derive(Clone, Default)]
pub struct CommandProvisioner {
    commands: Arc<HashMap<String, CommandSet>>,
}

impl CommandProvisioner {
    pub fn new(commands: HashMap<String, CommandSet>) -> Self {
        Self {
            commands: Arc::new(commands),
        }
    }

    fn commands_for(&self, worker: &str) -> Option<&CommandSet> {
        self.commands.get(worker)
    }
}

/// Run `cmd` with the worker environment, returning stderr on failure
async fn run(cmd: &str, worker: &str, kind: Option<&Kind>) -> Result<(), String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .env("LW_WORKER", worker)
        .env("LW_KIND", kind.map(Kind::as_str).unwrap_or(""))
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            return Err(format!("{}", output.status));
        }
        return Err(stderr.to_string());
    }

    Ok(())
}

#[async_trait]
impl Provisioner for CommandProvisioner {
    async fn start(&self, worker: &str, kind: Option<&Kind>) -> Result<(), ProvisionError> {
        let Some(cmd) = self.commands_for(worker).and_then(|c| c.start.as_deref()) else {
            return Ok(());
        };
        run(cmd, worker, kind)
            .await
            .map_err(ProvisionError::StartFailed)
    }

    async fn stop(&self, worker: &str, fast: bool) -> Result<(), ProvisionError> {
        let Some(commands) = self.commands_for(worker) else {
            return Ok(());
        };
        let cmd = if fast {
            commands.stop_fast.as_deref().or(commands.stop.as_deref())
        } else {
            commands.stop.as_deref()
        };
        let Some(cmd) = cmd else {
            return Ok(());
        };
        run(cmd, worker, None)
            .await
            .map_err(ProvisionError::StopFailed)
    }

    async fn check_health(&self, worker: &str) -> HealthStatus {
        let Some(cmd) = self.commands_for(worker).and_then(|c| c.health.as_deref()) else {
            return HealthStatus::Healthy;
        };
        match run(cmd, worker, None).await {
            Ok(()) => HealthStatus::Healthy,
            Err(reason) => HealthStatus::unhealthy(reason),
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
