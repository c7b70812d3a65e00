//! Behavioral specifications for latent worker lifecycles.
//!
//! These tests drive a worker through the public engine API against fake
//! adapters and verify adapter calls, states and published events.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// lifecycle/
#[path = "specs/lifecycle/coalescing.rs"]
mod lifecycle_coalescing;
#[path = "specs/lifecycle/edges.rs"]
mod lifecycle_edges;
#[path = "specs/lifecycle/failures.rs"]
mod lifecycle_failures;
#[path = "specs/lifecycle/health.rs"]
mod lifecycle_health;
#[path = "specs/lifecycle/idle.rs"]
mod lifecycle_idle;
#[path = "specs/lifecycle/kinds.rs"]
mod lifecycle_kinds;
