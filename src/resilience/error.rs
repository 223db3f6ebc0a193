//! Breaker error types.

use std::any::Any;

use thiserror::Error;

/// Boxed error returned by a wrapped operation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased operation result.
pub type Payload = Box<dyn Any + Send>;

/// Outcome of a call that did not produce a value.
#[derive(Debug, Error)]
pub enum BreakerError {
    /// The breaker is open and rejected the call without running it.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The wrapped operation failed.
    #[error(transparent)]
    Operation(BoxError),

    /// A fallback produced a value of a different type than the typed call expects.
    #[error("fallback returned a value that is not `{expected}`")]
    FallbackType { expected: &'static str },
}

impl BreakerError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, BreakerError::CircuitOpen)
    }

    /// Borrow the operation's own error, if this is one.
    pub fn operation_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            BreakerError::Operation(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Rejected breaker configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BreakerConfigError {
    #[error("failure threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}
