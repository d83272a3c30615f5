//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, quotas > 0, byte ceilings > 0)
//! - Check path shapes (report endpoint, exemptions, class prefixes)
//! - Check the shared backend URL scheme before any connection attempt
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system; a failed validation
//!   refuses startup rather than serving with an undefined posture

use crate::config::schema::{GateConfig, ScopeLimitConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{scope}: window_ms must be greater than zero")]
    ZeroWindow { scope: &'static str },

    #[error("{scope}: max_requests must be greater than zero")]
    ZeroQuota { scope: &'static str },

    #[error("{field}: path {path:?} must start with '/'")]
    RelativePath { field: &'static str, path: String },

    #[error("counter_store.backend_url {url:?} must use the redis:// or rediss:// scheme")]
    BackendScheme { url: String },

    #[error("counter_store.op_timeout_ms must be greater than zero")]
    ZeroOpTimeout,

    #[error("reporting.max_body_bytes must be greater than zero")]
    ZeroReportCeiling,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnectionLimit,

    #[error("observability.metrics_address {address:?} is not a socket address")]
    BadMetricsAddress { address: String },
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_scope("rate_limit.default", &config.rate_limit.default, &mut errors);
    check_scope(
        "rate_limit.auth_sensitive",
        &config.rate_limit.auth_sensitive,
        &mut errors,
    );
    check_scope("rate_limit.api", &config.rate_limit.api, &mut errors);

    check_paths(
        "rate_limit.exempt_paths",
        &config.rate_limit.exempt_paths,
        &mut errors,
    );
    check_paths(
        "route_classes.api_prefixes",
        &config.route_classes.api_prefixes,
        &mut errors,
    );
    check_paths(
        "route_classes.auth_sensitive_prefixes",
        &config.route_classes.auth_sensitive_prefixes,
        &mut errors,
    );
    check_paths(
        "security.report_endpoint",
        std::slice::from_ref(&config.security.report_endpoint),
        &mut errors,
    );

    let url = &config.counter_store.backend_url;
    if !url.is_empty() && !url.starts_with("redis://") && !url.starts_with("rediss://") {
        errors.push(ValidationError::BackendScheme { url: url.clone() });
    }
    if config.counter_store.op_timeout_ms == 0 {
        errors.push(ValidationError::ZeroOpTimeout);
    }
    if config.reporting.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroReportCeiling);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnectionLimit);
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::BadMetricsAddress {
            address: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_scope(scope: &'static str, limit: &ScopeLimitConfig, errors: &mut Vec<ValidationError>) {
    if limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow { scope });
    }
    if limit.max_requests == 0 {
        errors.push(ValidationError::ZeroQuota { scope });
    }
}

fn check_paths(field: &'static str, paths: &[String], errors: &mut Vec<ValidationError>) {
    for path in paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativePath {
                field,
                path: path.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GateConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = GateConfig::default();
        config.rate_limit.api.window_ms = 0;
        config.rate_limit.api.max_requests = 0;
        config.security.report_endpoint = "csp-report".to_string();
        config.counter_store.backend_url = "http://localhost:6379".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroWindow { scope: "rate_limit.api" }));
        assert!(errors.contains(&ValidationError::ZeroQuota { scope: "rate_limit.api" }));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = GateConfig::default();
        config.observability.metrics_address = "not-an-address".to_string();
        config.observability.metrics_enabled = false;
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
