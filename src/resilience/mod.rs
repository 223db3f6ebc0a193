//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Caller wants to reach a dependency:
//!     → registry.rs (route the dependency name to its breaker)
//!     → circuit_breaker.rs (admission check: closed / open / half-open)
//!     → caller's operation runs (only if admitted)
//!     → circuit_breaker.rs (record outcome, maybe transition)
//!     → window.rs (rolling failure rate over the last N outcomes)
//! ```
//!
//! # Design Decisions
//! - One breaker per logical dependency, multiplexed by name
//! - Fail fast in Open state; a fallback may stand in for the rejection
//! - Open → Half-Open is evaluated lazily on the next call or state query,
//!   no background timer
//! - Transition hooks are injected, and run after the breaker lock is released
//! - No retries and no timeouts here; both belong to the caller

pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod registry;
pub mod state;
pub mod window;

pub use circuit_breaker::{BreakerMetrics, CircuitBreaker, Config, Fallback};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BoxError, BreakerConfigError, BreakerError, Payload};
pub use registry::Registry;
pub use state::{State, Transition, TransitionObserver};
pub use window::{Outcome, OutcomeWindow};
