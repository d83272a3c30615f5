//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! admission gate. All types derive Serde traits for deserialization from
//! config files, and every section has defaults so a minimal (or empty)
//! config file is valid.

use serde::{Deserialize, Serialize};

/// Deployment environment. Selects the active security policy set.
///
/// Unknown values fail deserialization, which makes an unrecognized
/// environment a startup error rather than an undefined security posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Root configuration for the admission gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, concurrency ceiling).
    pub listener: ListenerConfig,

    /// Deployment environment (selects the security policy set).
    pub environment: Environment,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Counter store settings (shared backend + in-process fallback).
    pub counter_store: CounterStoreConfig,

    /// Per-scope rate limit policies and exemptions.
    pub rate_limit: RateLimitConfig,

    /// Route classification by path prefix.
    pub route_classes: RouteClassConfig,

    /// Security header / CSP policy settings.
    pub security: SecurityConfig,

    /// Violation report ingestion settings.
    pub reporting: ReportingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Counter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CounterStoreConfig {
    /// Shared backend URL (e.g., "redis://127.0.0.1:6379/").
    /// Empty disables the shared backend; counting is in-process only.
    pub backend_url: String,

    /// Key prefix for all counter keys in the shared backend.
    pub key_prefix: String,

    /// Per-operation timeout against the shared backend, in milliseconds.
    /// On expiry the call falls back to the in-process store.
    pub op_timeout_ms: u64,

    /// Entry count above which the in-process store prunes expired windows.
    pub local_high_water: usize,
}

impl Default for CounterStoreConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            key_prefix: "gate:rl:".to_string(),
            op_timeout_ms: 250,
            local_high_water: 10_000,
        }
    }
}

/// Identity key derivation strategy for a rate limit scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Authenticated principal id when present, else client address.
    ByIdentity,
    /// Always the client network address.
    ByNetworkAddress,
}

/// Window and quota for one rate limit scope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScopeLimitConfig {
    /// Counting window duration in milliseconds.
    pub window_ms: u64,

    /// Maximum requests admitted per identity per window.
    pub max_requests: u64,

    /// How counting keys are derived for this scope.
    pub key_strategy: KeyStrategy,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Catch-all scope for unclassified routes.
    pub default: ScopeLimitConfig,

    /// Scope for credential-sensitive routes (login, token refresh).
    pub auth_sensitive: ScopeLimitConfig,

    /// Scope for API routes.
    pub api: ScopeLimitConfig,

    /// Paths that bypass evaluation entirely (liveness/readiness probes).
    pub exempt_paths: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default: ScopeLimitConfig {
                window_ms: 60_000,
                max_requests: 120,
                key_strategy: KeyStrategy::ByIdentity,
            },
            auth_sensitive: ScopeLimitConfig {
                window_ms: 900_000,
                max_requests: 10,
                key_strategy: KeyStrategy::ByNetworkAddress,
            },
            api: ScopeLimitConfig {
                window_ms: 60_000,
                max_requests: 60,
                key_strategy: KeyStrategy::ByIdentity,
            },
            exempt_paths: vec!["/health".to_string(), "/ready".to_string()],
        }
    }
}

/// Route classification by path prefix.
///
/// A path matching an auth-sensitive prefix is gated by the auth-sensitive
/// scope even when it also matches an API prefix (most specific wins).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteClassConfig {
    /// Prefixes classified as API routes.
    pub api_prefixes: Vec<String>,

    /// Prefixes classified as auth-sensitive routes.
    pub auth_sensitive_prefixes: Vec<String>,
}

impl Default for RouteClassConfig {
    fn default() -> Self {
        Self {
            api_prefixes: vec!["/api/".to_string()],
            auth_sensitive_prefixes: vec!["/api/auth/".to_string()],
        }
    }
}

/// Security header / CSP policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Ingestion path for CSP violation reports.
    pub report_endpoint: String,

    /// Force report-only mode regardless of environment.
    /// Lets a tightened production policy be staged before enforcement.
    pub report_only: Option<bool>,

    /// Additional allowed `script-src` sources (CDNs).
    pub extra_script_sources: Vec<String>,

    /// Additional allowed `style-src` sources.
    pub extra_style_sources: Vec<String>,

    /// Additional allowed `connect-src` sources for non-API routes.
    pub extra_connect_sources: Vec<String>,

    /// Strict-Transport-Security max-age in seconds (production only).
    pub hsts_max_age_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            report_endpoint: "/csp-report".to_string(),
            report_only: None,
            extra_script_sources: Vec::new(),
            extra_style_sources: Vec::new(),
            extra_connect_sources: Vec::new(),
            hsts_max_age_secs: 31_536_000,
        }
    }
}

/// Violation report ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Byte ceiling for a report payload. Larger bodies are rejected
    /// without being buffered past the ceiling.
    pub max_body_bytes: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
