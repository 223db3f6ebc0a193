//! Named breaker registry.
//!
//! # Responsibilities
//! - Map a dependency name to exactly one breaker
//! - Create breakers lazily on first access
//! - Hand out point-in-time copies of the name → breaker map
//!
//! # Design Decisions
//! - Read-preferring lock: lookups of existing names share the read lock
//! - Creation takes the write lock and re-checks before inserting, so racing
//!   first accesses converge on one instance
//! - Entries are never replaced or removed

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::resilience::circuit_breaker::{CircuitBreaker, Config};
use crate::resilience::error::BreakerConfigError;

/// Concurrent map of named circuit breakers.
#[derive(Debug)]
pub struct Registry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    default_config: Config,
}

impl Registry {
    /// Create a registry whose lazily created breakers use `default_config`.
    ///
    /// The default configuration is validated here so later lookups cannot fail.
    pub fn new(default_config: Config) -> Result<Self, BreakerConfigError> {
        Ok(Self {
            breakers: RwLock::new(HashMap::new()),
            default_config: default_config.validated()?,
        })
    }

    /// Breaker for `name`, created with the default configuration on first access.
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(cb) = self.get(name) {
            return cb;
        }

        let mut breakers = self.breakers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(cb) = breakers.get(name) {
            return cb.clone();
        }

        let config = Config {
            name: name.to_string(),
            ..self.default_config.clone()
        };
        let cb = Arc::new(CircuitBreaker::from_validated(config));
        breakers.insert(name.to_string(), cb.clone());
        tracing::debug!(breaker = %name, "Circuit breaker registered");
        cb
    }

    /// Breaker for `name`, created with `config` on first access.
    ///
    /// If `name` is already registered the existing breaker is returned and
    /// `config` is ignored without being validated.
    pub fn get_or_create_with(
        &self,
        name: &str,
        config: Config,
    ) -> Result<Arc<CircuitBreaker>, BreakerConfigError> {
        if let Some(cb) = self.get(name) {
            return Ok(cb);
        }

        let mut breakers = self.breakers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(cb) = breakers.get(name) {
            return Ok(cb.clone());
        }

        let cb = Arc::new(CircuitBreaker::new(Config {
            name: name.to_string(),
            ..config
        })?);
        breakers.insert(name.to_string(), cb.clone());
        tracing::debug!(breaker = %name, "Circuit breaker registered with explicit config");
        Ok(cb)
    }

    /// Existing breaker for `name`, without creating one.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Independent copy of the current name → breaker associations.
    pub fn snapshot_all(&self) -> HashMap<String, Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.breakers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
