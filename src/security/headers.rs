//! Security header policy sets and the response middleware.
//!
//! # Responsibilities
//! - Hold one fully-specified SecurityPolicySet per environment
//! - Render CSP and companion headers, varied only by route class
//! - Annotate every outgoing response; never reject a request
//!
//! # Design Decisions
//! - Policy sets are built and header-validated once at startup; nothing
//!   is interpolated per request
//! - Rejection is exclusively the rate limiter's responsibility, so a
//!   policy change can never alter admission behavior
//! - Development runs report-only, production enforces; both carry the
//!   same report-uri so violations stay observable

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::config::schema::{Environment, SecurityConfig};
use crate::limiter::policy::RouteClassifier;

/// How the CSP is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    /// Violations are blocked by the client.
    Enforce,
    /// Violations are reported but not blocked.
    ReportOnly,
}

/// Header variation by route class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    General = 0,
    Api = 1,
}

/// A policy set failed to render into valid header values.
#[derive(Debug, thiserror::Error)]
#[error("security policy produced an invalid value for header {header}")]
pub struct PolicyRenderError {
    pub header: &'static str,
}

/// One environment's security header policy, pre-rendered per route class.
pub struct SecurityPolicySet {
    mode: PolicyMode,
    report_endpoint: String,
    rendered: [Vec<(HeaderName, HeaderValue)>; 2],
}

impl SecurityPolicySet {
    /// Build the policy set for an environment. Every header value is
    /// validated here so rendering at request time cannot fail.
    pub fn for_environment(
        environment: Environment,
        config: &SecurityConfig,
    ) -> Result<Self, PolicyRenderError> {
        let mode = match config.report_only {
            Some(true) => PolicyMode::ReportOnly,
            Some(false) => PolicyMode::Enforce,
            None => match environment {
                Environment::Development => PolicyMode::ReportOnly,
                Environment::Production => PolicyMode::Enforce,
            },
        };

        let rendered = [
            render_class(environment, mode, config, RouteClass::General)?,
            render_class(environment, mode, config, RouteClass::Api)?,
        ];

        Ok(Self {
            mode,
            report_endpoint: config.report_endpoint.clone(),
            rendered,
        })
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    pub fn report_endpoint(&self) -> &str {
        &self.report_endpoint
    }

    /// Headers for one route class. Pure lookup; values were validated at
    /// startup.
    pub fn render(&self, class: RouteClass) -> &[(HeaderName, HeaderValue)] {
        &self.rendered[class as usize]
    }
}

fn render_class(
    environment: Environment,
    mode: PolicyMode,
    config: &SecurityConfig,
    class: RouteClass,
) -> Result<Vec<(HeaderName, HeaderValue)>, PolicyRenderError> {
    let mut headers = Vec::new();

    let csp_name = match mode {
        PolicyMode::Enforce => HeaderName::from_static("content-security-policy"),
        PolicyMode::ReportOnly => HeaderName::from_static("content-security-policy-report-only"),
    };
    let csp_value = csp_value(environment, config, class);
    headers.push((
        csp_name,
        HeaderValue::from_str(&csp_value).map_err(|_| PolicyRenderError {
            header: "content-security-policy",
        })?,
    ));

    headers.push((
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    ));
    headers.push((
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    ));
    headers.push((
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    ));
    headers.push((
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
    ));
    headers.push((
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    ));
    headers.push((
        HeaderName::from_static("cross-origin-embedder-policy"),
        HeaderValue::from_static("require-corp"),
    ));
    headers.push((
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    ));

    if environment == Environment::Production {
        let hsts = format!(
            "max-age={}; includeSubDomains",
            config.hsts_max_age_secs
        );
        headers.push((
            HeaderName::from_static("strict-transport-security"),
            HeaderValue::from_str(&hsts).map_err(|_| PolicyRenderError {
                header: "strict-transport-security",
            })?,
        ));
    }

    if class == RouteClass::Api {
        headers.push((
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        ));
        headers.push((
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        ));
    }

    Ok(headers)
}

/// Assemble the CSP value for one (environment, route class) pair.
fn csp_value(environment: Environment, config: &SecurityConfig, class: RouteClass) -> String {
    let dev = environment == Environment::Development;

    let mut script: Vec<&str> = vec!["'self'"];
    if dev {
        // Dev tooling injects inline scripts and eval'd source maps.
        script.extend(["'unsafe-inline'", "'unsafe-eval'"]);
    }
    script.extend(config.extra_script_sources.iter().map(String::as_str));

    let mut style: Vec<&str> = vec!["'self'"];
    if dev {
        style.push("'unsafe-inline'");
    }
    style.extend(config.extra_style_sources.iter().map(String::as_str));

    // API responses have no page context to fetch from; lock connect-src
    // down to the origin itself.
    let mut connect: Vec<&str> = vec!["'self'"];
    if class == RouteClass::General {
        if dev {
            // Live-reload websockets.
            connect.push("ws:");
        }
        connect.extend(config.extra_connect_sources.iter().map(String::as_str));
    }

    let directives: Vec<(&str, Vec<&str>)> = vec![
        ("default-src", vec!["'self'"]),
        ("script-src", script),
        ("style-src", style),
        ("img-src", vec!["'self'", "data:"]),
        ("font-src", vec!["'self'"]),
        ("connect-src", connect),
        ("object-src", vec!["'none'"]),
        ("base-uri", vec!["'self'"]),
        ("frame-ancestors", vec!["'none'"]),
        ("report-uri", vec![config.report_endpoint.as_str()]),
    ];

    directives
        .iter()
        .map(|(name, sources)| format!("{} {}", name, sources.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// State for the header middleware: the startup-selected policy set plus
/// the shared route classifier.
#[derive(Clone)]
pub struct HeaderEngine {
    pub policy: Arc<SecurityPolicySet>,
    pub classifier: Arc<RouteClassifier>,
}

/// Middleware attaching the security header set to every response.
///
/// Purely additive: runs the inner service first and annotates whatever
/// came back, including rate-limit rejections.
pub async fn security_headers_middleware(
    State(engine): State<HeaderEngine>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let class = if engine.classifier.is_api(request.uri().path()) {
        RouteClass::Api
    } else {
        RouteClass::General
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in engine.policy.render(class) {
        headers.insert(name.clone(), value.clone());
    }
    response
}
