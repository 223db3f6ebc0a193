//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use circuit_guard::config::{BreakerSettings, DemoConfig, ServiceConfig};
use circuit_guard::{DemoServer, Shutdown};

/// A service with no simulated latency.
#[allow(dead_code)]
pub fn instant_service(name: &str, fail_rate: f64) -> ServiceConfig {
    ServiceConfig {
        min_latency_ms: 0,
        max_latency_ms: 0,
        ..ServiceConfig::new(name, fail_rate)
    }
}

/// Demo config with fast, deterministic services and a quick recovery timeout.
#[allow(dead_code)]
pub fn test_config() -> DemoConfig {
    let mut config = DemoConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.breaker = BreakerSettings {
        window_size: 10,
        failure_threshold: 0.5,
        min_requests: 5,
        recovery_timeout_secs: 1,
        probe_count: 2,
    };
    config.services = vec![
        instant_service("stable", 0.0),
        instant_service("flaky", 1.0),
    ];
    config
}

/// A running demo server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<DemoConfig>,
}

impl TestServer {
    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the demo server with `config` and wait until it accepts connections.
pub async fn start_server(config: DemoConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = DemoServer::new(&config).unwrap();
    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    TestServer {
        addr,
        shutdown,
        config_updates,
    }
}
