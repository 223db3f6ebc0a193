//! Simulated unreliable downstream services.

use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::schema::ServiceConfig;

/// Failure modes of a simulated call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}: internal server error")]
    Internal(String),

    #[error("{0}: call cancelled by caller")]
    Cancelled(String),
}

/// Runtime behaviour of one simulated service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceProfile {
    pub fail_rate: f64,
    pub min_latency: Duration,
    pub max_latency: Duration,
}

impl From<&ServiceConfig> for ServiceProfile {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            fail_rate: config.fail_rate,
            min_latency: Duration::from_millis(config.min_latency_ms),
            max_latency: Duration::from_millis(config.max_latency_ms),
        }
    }
}

/// Thread-safe table of simulated services, adjustable at runtime.
#[derive(Debug, Default)]
pub struct ServiceTable {
    profiles: DashMap<String, ServiceProfile>,
}

impl ServiceTable {
    pub fn from_config(services: &[ServiceConfig]) -> Self {
        let table = Self::default();
        table.apply(services);
        table
    }

    /// Insert or replace the profiles of `services`. Unlisted services are kept.
    pub fn apply(&self, services: &[ServiceConfig]) {
        for svc in services {
            self.profiles.insert(svc.name.clone(), ServiceProfile::from(svc));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn profile(&self, name: &str) -> Option<ServiceProfile> {
        self.profiles.get(name).map(|p| *p.value())
    }

    /// Change a service's failure probability. Returns false for unknown services.
    pub fn set_fail_rate(&self, name: &str, fail_rate: f64) -> bool {
        match self.profiles.get_mut(name) {
            Some(mut profile) => {
                profile.fail_rate = fail_rate;
                true
            }
            None => false,
        }
    }

    /// Service names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.profiles.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }
}

/// Simulate one call to `name`: sleep for a random latency, then fail with
/// the profile's probability. Gives up early if `cancel` fires.
pub async fn invoke(
    name: &str,
    profile: ServiceProfile,
    cancel: CancellationToken,
) -> Result<String, ServiceError> {
    let (latency, failed) = {
        let mut rng = rand::thread_rng();
        let latency = if profile.max_latency > profile.min_latency {
            rng.gen_range(profile.min_latency..=profile.max_latency)
        } else {
            profile.min_latency
        };
        (latency, rng.gen::<f64>() < profile.fail_rate)
    };

    tokio::select! {
        _ = cancel.cancelled() => return Err(ServiceError::Cancelled(name.to_string())),
        _ = tokio::time::sleep(latency) => {}
    }

    if failed {
        return Err(ServiceError::Internal(name.to_string()));
    }
    Ok(format!(
        "response from {} after {}ms",
        name,
        latency.as_millis()
    ))
}
