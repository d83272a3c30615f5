//! Rate limiting middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::limiter::engine::{Decision, RateLimiter};
use crate::limiter::policy::{IdentityKey, Principal};
use crate::observability::metrics;

/// Body of a 429 rejection. `retryAfter` is a string of whole seconds,
/// mirroring the `Retry-After` header.
#[derive(Debug, Serialize)]
struct QuotaExceededBody {
    error: &'static str,
    message: String,
    #[serde(rename = "retryAfter")]
    retry_after: String,
}

/// Middleware gating every protected request through the rate limiter.
///
/// Exempt paths bypass evaluation entirely: no counter is touched and no
/// limiter state is reflected on the response.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if limiter.classifier().is_exempt(&path) {
        return next.run(request).await;
    }

    let scope = limiter.classifier().scope_for(&path);
    let policy = limiter.policy(scope);
    let key = IdentityKey::derive(
        policy.key_strategy,
        request.extensions().get::<Principal>(),
        addr.ip(),
    );

    match limiter.evaluate(scope, &key).await {
        Decision::Allow => {
            metrics::record_decision(scope.as_str(), "allow");
            next.run(request).await
        }
        Decision::Deny { retry_after_secs } => {
            // Expected condition, not a server fault.
            tracing::debug!(
                scope = scope.as_str(),
                identity = %key,
                path = %path,
                retry_after_secs,
                "request denied by rate limit"
            );
            metrics::record_decision(scope.as_str(), "deny");
            quota_exceeded(retry_after_secs)
        }
    }
}

fn quota_exceeded(retry_after_secs: u64) -> Response {
    let retry_after = retry_after_secs.to_string();
    let body = QuotaExceededBody {
        error: "Too many requests",
        message: format!("Request quota exceeded, retry in {retry_after} seconds"),
        retry_after: retry_after.clone(),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}
