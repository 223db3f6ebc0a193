//! Configuration schema definitions.
//!
//! This module defines the configuration of the demo service.
//! All types derive Serde traits for deserialization from TOML files.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::{Config as BreakerConfig, TransitionObserver};

/// Root configuration for the demo service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Default breaker settings, used for every service without its own.
    pub breaker: BreakerSettings,

    /// Simulated downstream services.
    pub services: Vec<ServiceConfig>,

    /// Per-call settings applied by the HTTP handlers.
    pub call: CallConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            breaker: BreakerSettings::default(),
            services: vec![
                ServiceConfig::new("service-a", 0.3),
                ServiceConfig::new("service-b", 0.7),
            ],
            call: CallConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Serializable subset of the breaker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Outcomes kept in the sliding window.
    pub window_size: usize,

    /// Failure ratio (0.0–1.0] that opens the breaker.
    pub failure_threshold: f64,

    /// Minimum outcomes in the window before the breaker can trip.
    pub min_requests: usize,

    /// Seconds spent Open before probes are admitted.
    pub recovery_timeout_secs: u64,

    /// Successful probes needed to close again.
    pub probe_count: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            window_size: 20,
            failure_threshold: 0.5,
            min_requests: 5,
            recovery_timeout_secs: 10,
            probe_count: 3,
        }
    }
}

impl BreakerSettings {
    /// Build a breaker config named `name`, reporting transitions to `observer`.
    pub fn to_config(
        &self,
        name: &str,
        observer: Option<Arc<dyn TransitionObserver>>,
    ) -> BreakerConfig {
        BreakerConfig {
            name: name.to_string(),
            window_size: self.window_size,
            failure_threshold: self.failure_threshold,
            min_requests: self.min_requests,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
            probe_count: self.probe_count,
            on_state_change: observer,
            ..BreakerConfig::default()
        }
    }
}

/// A simulated unreliable downstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name; also the name of its breaker.
    pub name: String,

    /// Probability (0.0–1.0) that a call fails.
    pub fail_rate: f64,

    /// Lower bound of simulated latency in milliseconds.
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,

    /// Upper bound of simulated latency in milliseconds.
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,

    /// Breaker settings overriding the defaults for this service.
    #[serde(default)]
    pub breaker: Option<BreakerSettings>,
}

impl ServiceConfig {
    pub fn new(name: &str, fail_rate: f64) -> Self {
        Self {
            name: name.to_string(),
            fail_rate,
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            breaker: None,
        }
    }
}

fn default_min_latency_ms() -> u64 {
    10
}

fn default_max_latency_ms() -> u64 {
    50
}

/// Per-call settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CallConfig {
    /// Caller-side deadline in milliseconds. Calls cut off by it are not
    /// held against the service's breaker.
    pub deadline_ms: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self { deadline_ms: 1000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
