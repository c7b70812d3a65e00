// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use lw_adapters::{CommandProvisioner, TmuxConnector, TracedConnector, TracedProvisioner};
use lw_core::{ConfigError, FleetConfig, WorkerConfig};
use lw_engine::{Fleet, FleetError, HealthMonitor};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::server::ServerContext;

/// Provisioner used by the daemon (wrapped with tracing)
pub type DaemonProvisioner = TracedProvisioner<CommandProvisioner>;

/// Connector used by the daemon (wrapped with tracing)
pub type DaemonConnector = TracedConnector<TmuxConnector>;

pub type DaemonFleet = Fleet<DaemonProvisioner, DaemonConnector>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Fleet definition file
    pub fleet_path: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
}

impl Config {
    /// Create config for a fleet file. Each fleet file gets its own state
    /// directory and socket.
    pub fn for_fleet(fleet_path: &Path) -> Result<Self, LifecycleError> {
        let canonical = fleet_path
            .canonicalize()
            .map_err(|e| LifecycleError::FleetNotFound(fleet_path.to_path_buf(), e))?;

        let hash = fleet_hash(&canonical);
        let state_dir = state_dir()?.join("fleets").join(&hash);
        let socket_dir = socket_dir()?;

        Ok(Self {
            fleet_path: canonical,
            socket_path: socket_dir.join(format!("{}.sock", hash)),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
        })
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub listener: UnixListener,
    /// Shared with every connection task
    pub context: Arc<ServerContext<DaemonProvisioner, DaemonConnector>>,
    /// Changes when a client requests shutdown
    pub shutdown_requested: watch::Receiver<bool>,
    monitor: Option<HealthMonitor>,
}

impl DaemonState {
    /// Shutdown the daemon gracefully: stop polling, tear down every
    /// worker, then remove the socket and PID files.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        if let Some(monitor) = self.monitor.take() {
            monitor.shutdown().await;
        }

        for (worker, error) in self.context.fleet.shutdown_all().await {
            warn!(worker = %worker, error = %error, "worker did not stop cleanly");
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Fleet file not found at {0}: {1}")]
    FleetNotFound(PathBuf, std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Fleet config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fleet error: {0}")]
    Fleet(#[from] FleetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state and socket directories
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents two daemons driving one fleet
    let mut lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    {
        use std::io::Write;
        writeln!(lock_file, "{}", std::process::id())?;
    }

    // 3. Load the fleet BEFORE binding the socket (fail fast on bad config)
    let fleet_config = FleetConfig::load(&config.fleet_path)?;
    let workers = fleet_config.worker_configs()?;
    let fleet = Arc::new(build_fleet(workers)?);

    info!(
        "Loaded fleet: {} workers ({})",
        fleet.len(),
        fleet.names().join(", ")
    );

    // 4. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 5. Start health polling
    let monitor = HealthMonitor::spawn(Arc::clone(&fleet), fleet_config.defaults.health_interval);

    let (context, shutdown_requested) = ServerContext::new(fleet);

    info!("Daemon started for fleet: {}", config.fleet_path.display());

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        context: Arc::new(context),
        shutdown_requested,
        monitor: Some(monitor),
    })
}

/// Wire every worker to the command provisioner and tmux connector
fn build_fleet(workers: Vec<WorkerConfig>) -> Result<DaemonFleet, LifecycleError> {
    let commands: HashMap<String, _> = workers
        .iter()
        .map(|w| (w.name.clone(), w.commands.clone()))
        .collect();
    let connect: HashMap<String, String> = workers
        .iter()
        .filter_map(|w| Some((w.name.clone(), w.commands.connect.clone()?)))
        .collect();

    let provisioner = TracedProvisioner::new(CommandProvisioner::new(commands));
    let connector = TracedConnector::new(TmuxConnector::new(connect));
    Ok(Fleet::from_configs(workers, provisioner, connector)?)
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }

    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the state directory for lw
fn state_dir() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("lw"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/lw"))
}

/// Get the socket directory for lw
///
/// Uses /tmp/lw by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with LW_SOCKET_DIR for testing.
fn socket_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("LW_SOCKET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(PathBuf::from("/tmp/lw"))
}

/// Compute fleet hash for unique daemon directory
fn fleet_hash(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
