//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Build the breaker registry and service table from configuration
//! - Apply configuration updates while running
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::{BreakerSettings, DemoConfig, ServiceConfig};
use crate::http::handlers;
use crate::lifecycle::shutdown;
use crate::observability::{metrics, TransitionLogger};
use crate::resilience::{BreakerConfigError, Registry, TransitionObserver};
use crate::services::ServiceTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub services: Arc<ServiceTable>,
    pub call_deadline: Duration,
    observer: Arc<dyn TransitionObserver>,
}

impl AppState {
    /// Build state from configuration, registering one breaker per service.
    pub fn from_config(config: &DemoConfig) -> Result<Self, BreakerConfigError> {
        let observer: Arc<dyn TransitionObserver> = Arc::new(TransitionLogger);
        let registry = Registry::new(config.breaker.to_config("", Some(observer.clone())))?;

        let state = Self {
            registry: Arc::new(registry),
            services: Arc::new(ServiceTable::from_config(&config.services)),
            call_deadline: Duration::from_millis(config.call.deadline_ms),
            observer,
        };
        for svc in &config.services {
            state.register(svc, &config.breaker)?;
        }
        Ok(state)
    }

    /// Apply a reloaded configuration, returning the names of services it added.
    ///
    /// Service profiles are replaced; new services get breakers. Breakers that
    /// already exist keep their original settings.
    pub fn apply(&self, config: &DemoConfig) -> Vec<String> {
        let added: Vec<String> = config
            .services
            .iter()
            .filter(|svc| !self.services.contains(&svc.name))
            .map(|svc| svc.name.clone())
            .collect();

        self.services.apply(&config.services);
        for svc in &config.services {
            if let Err(e) = self.register(svc, &config.breaker) {
                tracing::error!(service = %svc.name, error = %e, "Failed to register breaker");
            }
        }
        tracing::info!(
            services = config.services.len(),
            added = ?added,
            "Configuration update applied"
        );
        added
    }

    fn register(
        &self,
        svc: &ServiceConfig,
        defaults: &BreakerSettings,
    ) -> Result<(), BreakerConfigError> {
        let settings = svc.breaker.unwrap_or(*defaults);
        let breaker = self.registry.get_or_create_with(
            &svc.name,
            settings.to_config(&svc.name, Some(self.observer.clone())),
        )?;
        metrics::record_state(&svc.name, breaker.state());
        Ok(())
    }
}

/// HTTP server exposing the breaker demo API.
pub struct DemoServer {
    router: Router,
    state: AppState,
}

impl DemoServer {
    /// Create a new server, failing on invalid breaker settings.
    pub fn new(config: &DemoConfig) -> Result<Self, BreakerConfigError> {
        let state = AppState::from_config(config)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/api/call", get(handlers::call_service))
            .route("/api/status", get(handlers::status))
            .route("/api/config", post(handlers::update_config))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, applying configs from `config_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<DemoConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Demo server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                let _ = state.apply(&new_config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("Demo server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::State;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn config() -> DemoConfig {
        let mut config = DemoConfig::default();
        config.services = vec![
            ServiceConfig {
                min_latency_ms: 0,
                max_latency_ms: 0,
                ..ServiceConfig::new("healthy", 0.0)
            },
            ServiceConfig {
                min_latency_ms: 0,
                max_latency_ms: 0,
                breaker: Some(BreakerSettings {
                    window_size: 4,
                    min_requests: 2,
                    ..BreakerSettings::default()
                }),
                ..ServiceConfig::new("broken", 1.0)
            },
        ];
        config
    }

    #[test]
    fn test_breakers_registered_up_front() {
        let server = DemoServer::new(&config()).unwrap();
        let registry = &server.state().registry;

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("broken").unwrap().config().window_size, 4);
        assert_eq!(registry.get("healthy").unwrap().config().window_size, 20);
    }

    #[test]
    fn test_invalid_breaker_settings_rejected() {
        let mut config = config();
        config.breaker.failure_threshold = 3.0;
        assert!(DemoServer::new(&config).is_err());
    }

    #[test]
    fn test_apply_adds_services_keeps_breakers() {
        let server = DemoServer::new(&config()).unwrap();
        let state = server.state();
        let before = state.registry.get("broken").unwrap();

        let mut update = config();
        update.services[1].breaker = Some(BreakerSettings {
            window_size: 50,
            ..BreakerSettings::default()
        });
        update.services.push(ServiceConfig::new("fresh", 0.2));
        assert_eq!(state.apply(&update), vec!["fresh".to_string()]);
        assert!(state.apply(&update).is_empty());

        let after = state.registry.get("broken").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.config().window_size, 4);
        assert!(state.registry.get("fresh").is_some());
        assert!(state.services.contains("fresh"));
    }

    #[tokio::test]
    async fn test_router_trips_broken_service() {
        let server = DemoServer::new(&config()).unwrap();
        let app = server.router();

        for _ in 0..2 {
            let res = app
                .clone()
                .oneshot(Request::get("/api/call?service=broken").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        }

        let breaker = server.state().registry.get("broken").unwrap();
        assert_eq!(breaker.state(), State::Open);
    }

    #[test]
    fn test_state_gauge_set_on_registration() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || DemoServer::new(&config()).unwrap());

        let rendered = handle.render();
        assert!(rendered.contains("breaker_state{breaker=\"healthy\"} 0"));
        assert!(rendered.contains("breaker_state{breaker=\"broken\"} 0"));
    }

    #[tokio::test]
    async fn test_health() {
        let server = DemoServer::new(&config()).unwrap();
        let res = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
