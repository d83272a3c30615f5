//! Admission gate binary.
//!
//! Loads configuration, initializes observability, and serves the gate
//! around a stand-in downstream router. In a deployment the protected
//! application is mounted where the stand-in sits.

use std::path::PathBuf;

use axum::{http::StatusCode, response::Json, routing::get, Router};
use clap::Parser;
use tokio::net::TcpListener;

use admission_gate::config::{load_config, Environment, GateConfig};
use admission_gate::lifecycle::Shutdown;
use admission_gate::observability::{logging, metrics};
use admission_gate::GateServer;

#[derive(Debug, Parser)]
#[command(name = "admission-gate", version, about = "Request admission gate")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured environment (development | production).
    #[arg(short, long)]
    environment: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };
    if let Some(environment) = &args.environment {
        config.environment = environment.parse::<Environment>()?;
    }

    logging::init(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        bind_address = %config.listener.bind_address,
        shared_backend = !config.counter_store.backend_url.is_empty(),
        "admission-gate starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    // Stand-in downstream: a service banner and a 404 fallback, so every
    // path still exercises the full admission stack.
    let downstream = Router::new()
        .route("/", get(banner))
        .fallback(not_found);

    let shutdown = Shutdown::new();
    let server = GateServer::new(config, downstream)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn banner() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "admission-gate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
