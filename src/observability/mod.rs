//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers and handlers produce:
//!     → logging.rs (structured log events, transition logger)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Breakers never log transitions on their own; the transition logger
//!   is injected as an observer where wanted
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, TransitionLogger};
