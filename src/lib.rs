//! In-process circuit breakers for unreliable dependencies.
//!
//! The core lives in [`resilience`]: a sliding outcome window, the
//! three-state breaker built on it, and a registry that hands out one
//! breaker per dependency name. The remaining modules make up the demo
//! service that exercises the core over HTTP.

// Core
pub mod resilience;

// Demo service
pub mod config;
pub mod http;
pub mod services;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::DemoConfig;
pub use http::DemoServer;
pub use lifecycle::Shutdown;
pub use resilience::{BreakerError, CircuitBreaker, Config, Registry, State};
