//! Breaker state machine labels and transition hooks.
//!
//! # States
//! - Closed: normal operation, calls pass through and are tracked
//! - Open: dependency assumed down, calls are rejected without running
//! - Half-Open: a bounded number of probe calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: window holds >= min_requests and failure rate >= threshold
//! Open → Half-Open: recovery timeout elapsed (checked on next call/query)
//! Half-Open → Closed: probe_count probes succeed
//! Half-Open → Open: any probe fails
//! ```

use std::fmt;

use serde::Serialize;

/// Current admission state of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change that has already been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub to: State,
}

/// Receives breaker state changes.
///
/// Called after the breaker has released its lock, with the new state
/// already in effect. Implementations must be cheap; they run on the
/// caller's thread.
pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, name: &str, from: State, to: State);
}

impl<F> TransitionObserver for F
where
    F: Fn(&str, State, State) + Send + Sync,
{
    fn on_transition(&self, name: &str, from: State, to: State) {
        self(name, from, to)
    }
}
