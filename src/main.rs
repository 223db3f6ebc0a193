//! Circuit breaker demo server.
//!
//! Serves a small HTTP API in front of simulated flaky services, each
//! guarded by its own breaker:
//!
//! ```text
//! GET  /api/call?service=service-a   call through the breaker
//! GET  /api/status                   breaker metrics
//! POST /api/config                   {"service": "...", "fail_rate": 0.8}
//! ```
//!
//! Usage: `circuit-guard [config.toml]`. Without a file the built-in
//! defaults are used; with one, edits to the file are applied live.

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use circuit_guard::config::loader::load_config;
use circuit_guard::config::watcher::ConfigWatcher;
use circuit_guard::observability::{init_logging, metrics};
use circuit_guard::{DemoConfig, DemoServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => DemoConfig::default(),
    };

    init_logging(&config.observability.log_level, config.observability.json_logs)?;
    tracing::info!("circuit-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        window_size = config.breaker.window_size,
        failure_threshold = config.breaker.failure_threshold,
        recovery_timeout_secs = config.breaker.recovery_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = DemoServer::new(&config)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
