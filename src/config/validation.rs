//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (fail rates, thresholds, latency bounds)
//! - Detect duplicate service names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DemoConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BreakerSettings, DemoConfig};
use crate::resilience::BreakerConfigError;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("duplicate service `{0}`")]
    DuplicateService(String),

    #[error("service `{service}`: fail_rate must be in [0, 1], got {value}")]
    FailRate { service: String, value: f64 },

    #[error("service `{service}`: min_latency_ms ({min}) exceeds max_latency_ms ({max})")]
    Latency { service: String, min: u64, max: u64 },

    #[error("{scope}: failure_threshold must not exceed 1, got {value}")]
    Threshold { scope: String, value: f64 },

    #[error("call deadline must be positive")]
    Deadline,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &DemoConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.call.deadline_ms == 0 {
        errors.push(ValidationError::Deadline);
    }

    check_breaker("breaker", &config.breaker, &mut errors);

    let mut seen = HashSet::new();
    for svc in &config.services {
        if svc.name.is_empty() {
            errors.push(ValidationError::EmptyServiceName);
        } else if !seen.insert(svc.name.as_str()) {
            errors.push(ValidationError::DuplicateService(svc.name.clone()));
        }

        if !is_fail_rate(svc.fail_rate) {
            errors.push(ValidationError::FailRate {
                service: svc.name.clone(),
                value: svc.fail_rate,
            });
        }

        if svc.min_latency_ms > svc.max_latency_ms {
            errors.push(ValidationError::Latency {
                service: svc.name.clone(),
                min: svc.min_latency_ms,
                max: svc.max_latency_ms,
            });
        }

        if let Some(settings) = &svc.breaker {
            check_breaker(&format!("service `{}` breaker", svc.name), settings, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Whether `rate` is a usable failure probability.
pub fn is_fail_rate(rate: f64) -> bool {
    (0.0..=1.0).contains(&rate)
}

/// Breaker settings are checked by the breaker's own rule: a threshold at
/// or below zero falls back to the default, NaN or above one is rejected.
fn check_breaker(scope: &str, settings: &BreakerSettings, errors: &mut Vec<ValidationError>) {
    if let Err(BreakerConfigError::InvalidThreshold(value)) =
        settings.to_config(scope, None).validated()
    {
        errors.push(ValidationError::Threshold {
            scope: scope.to_string(),
            value,
        });
    }
}
