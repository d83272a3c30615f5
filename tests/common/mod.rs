//! Shared utilities for integration testing.

use std::time::Duration;

use axum::{response::Json, routing::get, Router};
use tokio::net::TcpListener;

use admission_gate::config::GateConfig;
use admission_gate::lifecycle::Shutdown;
use admission_gate::GateServer;

/// Config with the metrics exporter disabled (one recorder per process)
/// and everything else at defaults.
pub fn test_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.observability.metrics_enabled = false;
    config
}

/// A downstream with one route per class plus a catch-all, so any path
/// exercises the full admission stack.
pub fn stand_in_downstream() -> Router {
    Router::new()
        .route("/", get(ok))
        .route("/dashboard", get(ok))
        .route("/assets/app.js", get(ok))
        .route("/api/widgets", get(ok))
        .route("/api/auth/login", get(ok).post(ok))
        .fallback(ok)
}

async fn ok() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Spawn a gate on an ephemeral port. Returns its base URL and the
/// shutdown handle keeping it alive.
pub async fn spawn_gate(config: GateConfig) -> (String, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = GateServer::new(config, stand_in_downstream()).expect("gate must build");

    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    (format!("http://{addr}"), shutdown)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}
