//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the admission layers around a caller-supplied downstream
//! - Mount the violation report endpoint outside the admission stack
//! - Wire up cross-cutting middleware (timeout, request ID, tracing,
//!   concurrency ceiling)
//! - Serve with graceful shutdown
//!
//! # Middleware order (request direction)
//! ```text
//! concurrency limit → trace → request id → timeout
//!     → security headers (response annotation)
//!     → rate limit (admit or 429)
//!     → downstream
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::http::request::RequestIdLayer;
use crate::lifecycle::signals;
use crate::limiter::engine::RateLimiter;
use crate::limiter::middleware::rate_limit_middleware;
use crate::limiter::policy::RouteClassifier;
use crate::limiter::store::{CounterStore, StoreError};
use crate::security::headers::{
    security_headers_middleware, HeaderEngine, PolicyRenderError, SecurityPolicySet,
};
use crate::security::reporting::{ingest_report, ViolationPipeline};

/// Startup failure. Any of these refuses to serve rather than run with
/// an undefined admission or security posture.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("configuration invalid: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Policy(#[from] PolicyRenderError),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The admission gate: an HTTP server wrapping a downstream router with
/// rate limiting and security header policy.
pub struct GateServer {
    app: Router,
    config: GateConfig,
}

impl GateServer {
    /// Build the gate around `downstream`.
    ///
    /// The gate adds a `/health` liveness route (exempt from limiting by
    /// default config) and the violation report endpoint; `downstream`
    /// must not define either path.
    pub fn new(config: GateConfig, downstream: Router) -> Result<Self, BuildError> {
        validate_config(&config).map_err(BuildError::Validation)?;

        let store = Arc::new(CounterStore::from_config(&config.counter_store)?);
        let classifier = Arc::new(RouteClassifier::new(
            &config.route_classes,
            &config.rate_limit.exempt_paths,
        ));
        let limiter = Arc::new(RateLimiter::new(
            &config.rate_limit,
            classifier.clone(),
            store,
        ));
        let policy = Arc::new(SecurityPolicySet::for_environment(
            config.environment,
            &config.security,
        )?);
        let pipeline = Arc::new(ViolationPipeline::new(config.reporting.max_body_bytes));

        // Admission stack: headers wrap the limiter so 429s are annotated.
        let protected = downstream
            .route("/health", get(health))
            .layer(middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                HeaderEngine { policy, classifier },
                security_headers_middleware,
            ));

        // Reports bypass admission; the pipeline enforces its own byte
        // ceiling while reading, so axum's default limit is disabled to
        // keep oversized input a 400, not a 413.
        let report_route = post(ingest_report)
            .layer(DefaultBodyLimit::disable())
            .with_state(pipeline);

        let app = Router::new()
            .route(&config.security.report_endpoint, report_route)
            .merge(protected)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
            .layer(GlobalConcurrencyLimitLayer::new(
                config.listener.max_connections,
            ));

        Ok(Self { app, config })
    }

    /// Run the server until a signal arrives or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = %self.config.environment,
            "admission gate listening"
        );

        let app = self
            .app
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = signals::wait() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("admission gate stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
