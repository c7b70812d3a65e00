// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Latent worker lifecycle engine

mod coalesce;
mod error;
mod fleet;
mod health;
mod idle;
mod worker;

pub use coalesce::Coalescer;
pub use error::{FleetError, WorkerError};
pub use fleet::Fleet;
pub use health::HealthMonitor;
pub use idle::{AlwaysStop, IdlePolicy, IdleTimer, MinUptime};
pub use worker::LatentWorker;
