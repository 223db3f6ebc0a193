//! Downstream services guarded by the demo.
//!
//! # Responsibilities
//! - Hold the runtime profile (fail rate, latency) of each simulated service
//! - Simulate calls that are slow, flaky, and cancellable
//!
//! # Design Decisions
//! - Profiles live in a concurrent map so handlers can adjust them while
//!   calls are in flight
//! - A cancelled call returns an error, which the breaker leaves out of its
//!   bookkeeping

pub mod simulated;

pub use simulated::{invoke, ServiceError, ServiceProfile, ServiceTable};
