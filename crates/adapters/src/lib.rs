// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for provisioning backends and live worker connections

pub mod connection;
pub mod provision;
pub mod traced;

pub use connection::{ConnectionError, Connector, TmuxConnector};
pub use provision::{CommandProvisioner, ProvisionError, Provisioner};
pub use traced::{TracedConnector, TracedProvisioner};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use connection::{ConnectionCall, FakeConnector};
#[cfg(any(test, feature = "test-support"))]
pub use provision::{Completion, FakeProvisioner, ProvisionCall};
