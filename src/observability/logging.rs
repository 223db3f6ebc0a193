//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Log breaker state changes through an injected observer
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config, `RUST_LOG` overrides it

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::observability::metrics;
use crate::resilience::{State, TransitionObserver};

/// Install the global tracing subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging(
    level: &str,
    json: bool,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("circuit_guard={level},tower_http={level}").into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}

/// Transition observer that logs each state change and counts it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionLogger;

impl TransitionObserver for TransitionLogger {
    fn on_transition(&self, name: &str, from: State, to: State) {
        tracing::warn!(
            breaker = %name,
            from = %from,
            to = %to,
            "Circuit breaker state change"
        );
        metrics::record_transition(name, from, to);
    }
}
