// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet configuration
//!
//! Workers are declared in a TOML file:
//!
//! ```toml
//! [defaults]
//! build_wait_timeout = "10m"
//!
//! [[worker]]
//! name = "linux-large"
//! kind = "{{ arch }}-large"
//! build_wait_timeout = "never"
//!
//! [worker.commands]
//! start = "cloudctl up linux-large --kind $LW_KIND"
//! stop = "cloudctl down linux-large"
//! ```

use crate::kind::KindExpr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BUILD_WAIT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// Errors loading fleet configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("invalid fleet config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("worker name must not be empty")]
    EmptyName,
    #[error("duplicate worker name: {0}")]
    DuplicateWorker(String),
}

/// How long a started worker may sit without builds before teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTimeout {
    /// Never tear down automatically
    Never,
    /// Tear down after this long with no builds; zero means immediately
    After(Duration),
}

impl IdleTimeout {
    pub fn duration(self) -> Option<Duration> {
        match self {
            IdleTimeout::Never => None,
            IdleTimeout::After(d) => Some(d),
        }
    }
}

impl Default for IdleTimeout {
    fn default() -> Self {
        IdleTimeout::After(DEFAULT_BUILD_WAIT)
    }
}

impl FromStr for IdleTimeout {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "never" => Ok(IdleTimeout::Never),
            other => humantime::parse_duration(other).map(IdleTimeout::After),
        }
    }
}

impl fmt::Display for IdleTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdleTimeout::Never => f.write_str("never"),
            IdleTimeout::After(d) => write!(f, "{}", humantime::format_duration(*d)),
        }
    }
}

impl<'de> Deserialize<'de> for IdleTimeout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for IdleTimeout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Shell commands driving a command-backed provisioner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSet {
    pub start: Option<String>,
    pub stop: Option<String>,
    /// Used for fast teardown; falls back to `stop`
    pub stop_fast: Option<String>,
    pub health: Option<String>,
    /// Long-running command holding the live session to the worker
    pub connect: Option<String>,
}

/// Fleet-wide defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub build_wait_timeout: IdleTimeout,
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_health_interval", with = "humantime_serde")]
    pub health_interval: Duration,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_health_interval() -> Duration {
    DEFAULT_HEALTH_INTERVAL
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            build_wait_timeout: IdleTimeout::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            health_interval: DEFAULT_HEALTH_INTERVAL,
        }
    }
}

/// A `[[worker]]` table as written in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerEntry {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub build_wait_timeout: Option<IdleTimeout>,
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub min_uptime: Option<Duration>,
    #[serde(default)]
    pub commands: CommandSet,
}

/// Parsed fleet file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default, rename = "worker")]
    pub workers: Vec<WorkerEntry>,
}

impl FleetConfig {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&content)
    }

    /// Resolve every worker against the defaults, enforcing unique names
    pub fn worker_configs(&self) -> Result<Vec<WorkerConfig>, ConfigError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.workers.len());

        for entry in &self.workers {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::DuplicateWorker(name.to_string()));
            }

            resolved.push(WorkerConfig {
                name: name.to_string(),
                kind: entry
                    .kind
                    .as_deref()
                    .map(KindExpr::parse)
                    .unwrap_or_default(),
                build_wait_timeout: entry
                    .build_wait_timeout
                    .unwrap_or(self.defaults.build_wait_timeout),
                connect_timeout: entry
                    .connect_timeout
                    .unwrap_or(self.defaults.connect_timeout),
                min_uptime: entry.min_uptime,
                commands: entry.commands.clone(),
            });
        }

        tracing::debug!(workers = resolved.len(), "resolved fleet config");
        Ok(resolved)
    }
}

/// Fully resolved configuration of one latent worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub name: String,
    pub kind: KindExpr,
    pub build_wait_timeout: IdleTimeout,
    /// How long to wait for the live session after a successful start
    pub connect_timeout: Duration,
    /// Keep the resource up at least this long before idle teardown
    pub min_uptime: Option<Duration>,
    pub commands: CommandSet,
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: KindExpr::Any,
            build_wait_timeout: IdleTimeout::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            min_uptime: None,
            commands: CommandSet::default(),
        }
    }

    pub fn with_kind(mut self, kind: KindExpr) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_build_wait_timeout(mut self, timeout: IdleTimeout) -> Self {
        self.build_wait_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_min_uptime(mut self, min_uptime: Duration) -> Self {
        self.min_uptime = Some(min_uptime);
        self
    }

    pub fn with_commands(mut self, commands: CommandSet) -> Self {
        self.commands = commands;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
