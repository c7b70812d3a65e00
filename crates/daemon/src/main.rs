// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Latent Worker Daemon (lwd)
//!
//! Owns a fleet of latent workers and serves lifecycle requests for them.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;
mod protocol;
mod server;

use std::path::PathBuf;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::lifecycle::{Config, LifecycleError};

/// Fleet file used when none is given
const DEFAULT_FLEET_FILE: &str = "fleet.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let fleet_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir()?.join(DEFAULT_FLEET_FILE),
    };

    // Load configuration
    let config = Config::for_fleet(&fleet_path)?;

    // Write startup marker to log (before tracing setup, so it survives a failed start)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting lwd for fleet: {}", config.fleet_path.display());

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        "Daemon ready, listening on {}",
        config.socket_path.display()
    );

    // Signal ready for parent process (e.g., systemd)
    println!("READY");

    loop {
        tokio::select! {
            // Accept client connections; each one is served on its own task
            result = daemon.listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        server::spawn_connection(daemon.context.clone(), stream);
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }

            // Shutdown requested via IPC
            Ok(()) = daemon.shutdown_requested.changed() => {
                info!("Shutdown requested via IPC, shutting down...");
                break;
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- lwd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- lwd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
