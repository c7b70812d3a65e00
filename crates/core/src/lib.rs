// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lw-core: pure building blocks for the latent worker manager
//!
//! This crate provides:
//! - The four-state worker lifecycle and its legal edges
//! - Capability kinds and kind templates rendered against build properties
//! - The compatibility resolver deciding reuse vs. restart
//! - Events published to the reporting layer
//! - Fleet configuration loaded from TOML

pub mod compat;
pub mod config;
pub mod event;
pub mod health;
pub mod kind;
pub mod state;
pub mod status;

// Re-exports
pub use compat::{resolve, Compatibility};
pub use config::{
    CommandSet, ConfigError, Defaults, FleetConfig, IdleTimeout, WorkerConfig, WorkerEntry,
};
pub use event::WorkerEvent;
pub use health::HealthStatus;
pub use kind::{BuildContext, Kind, KindError, KindExpr};
pub use state::WorkerState;
pub use status::WorkerStatus;
