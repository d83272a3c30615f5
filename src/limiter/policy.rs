//! Rate limit policies, scopes, and identity key derivation.
//!
//! # Responsibilities
//! - Define the per-scope policies (window, quota, key strategy)
//! - Classify request paths into scopes with fixed precedence
//! - Derive the counting key for a request
//!
//! # Design Decisions
//! - Policies are immutable after construction, one per scope
//! - Precedence is AuthSensitive > Api > Default; exactly one scope gates
//!   a request, scopes are never stacked
//! - Prefix matching only, no regex, to keep classification O(n)

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::schema::{KeyStrategy, RateLimitConfig, RouteClassConfig, ScopeLimitConfig};

/// Rate limit scope, from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyScope {
    AuthSensitive,
    Api,
    Default,
}

impl PolicyScope {
    /// Stable label used in counting keys, logs, and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyScope::AuthSensitive => "auth_sensitive",
            PolicyScope::Api => "api",
            PolicyScope::Default => "default",
        }
    }
}

/// Immutable policy for one scope, built once at startup.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub scope: PolicyScope,
    pub window: Duration,
    pub max_requests: u64,
    pub key_strategy: KeyStrategy,
}

impl RateLimitPolicy {
    fn from_config(scope: PolicyScope, config: &ScopeLimitConfig) -> Self {
        Self {
            scope,
            window: Duration::from_millis(config.window_ms),
            max_requests: config.max_requests,
            key_strategy: config.key_strategy,
        }
    }
}

/// The full policy set, one policy per scope.
#[derive(Debug, Clone)]
pub struct PolicySet {
    default: RateLimitPolicy,
    auth_sensitive: RateLimitPolicy,
    api: RateLimitPolicy,
}

impl PolicySet {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            default: RateLimitPolicy::from_config(PolicyScope::Default, &config.default),
            auth_sensitive: RateLimitPolicy::from_config(
                PolicyScope::AuthSensitive,
                &config.auth_sensitive,
            ),
            api: RateLimitPolicy::from_config(PolicyScope::Api, &config.api),
        }
    }

    pub fn policy(&self, scope: PolicyScope) -> &RateLimitPolicy {
        match scope {
            PolicyScope::AuthSensitive => &self.auth_sensitive,
            PolicyScope::Api => &self.api,
            PolicyScope::Default => &self.default,
        }
    }
}

/// Authenticated principal, attached to the request extensions by the
/// upstream authentication collaborator before this layer runs.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
}

/// The value a request's counts are bucketed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Derive the counting key per the policy's strategy.
    pub fn derive(strategy: KeyStrategy, principal: Option<&Principal>, remote: IpAddr) -> Self {
        match (strategy, principal) {
            (KeyStrategy::ByIdentity, Some(p)) => Self(format!("user:{}", p.id)),
            (KeyStrategy::ByIdentity, None) | (KeyStrategy::ByNetworkAddress, _) => {
                Self(format!("addr:{remote}"))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classifies request paths into scopes and route classes.
#[derive(Debug)]
pub struct RouteClassifier {
    api_prefixes: Vec<String>,
    auth_sensitive_prefixes: Vec<String>,
    exempt_paths: HashSet<String>,
}

impl RouteClassifier {
    pub fn new(classes: &RouteClassConfig, exempt_paths: &[String]) -> Self {
        Self {
            api_prefixes: classes.api_prefixes.clone(),
            auth_sensitive_prefixes: classes.auth_sensitive_prefixes.clone(),
            exempt_paths: exempt_paths.iter().cloned().collect(),
        }
    }

    /// Most specific applicable scope for a path.
    pub fn scope_for(&self, path: &str) -> PolicyScope {
        if matches_prefix(&self.auth_sensitive_prefixes, path) {
            PolicyScope::AuthSensitive
        } else if matches_prefix(&self.api_prefixes, path) {
            PolicyScope::Api
        } else {
            PolicyScope::Default
        }
    }

    /// Whether the path is classified as an API route (header variation).
    pub fn is_api(&self, path: &str) -> bool {
        matches_prefix(&self.api_prefixes, path)
            || matches_prefix(&self.auth_sensitive_prefixes, path)
    }

    /// Exempt paths bypass admission evaluation entirely.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.contains(path)
    }
}

fn matches_prefix(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|p| path.starts_with(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RateLimitConfig;

    fn classifier() -> RouteClassifier {
        RouteClassifier::new(
            &RouteClassConfig::default(),
            &["/health".to_string(), "/ready".to_string()],
        )
    }

    #[test]
    fn auth_sensitive_wins_over_api() {
        let c = classifier();
        assert_eq!(c.scope_for("/api/auth/login"), PolicyScope::AuthSensitive);
        assert_eq!(c.scope_for("/api/widgets"), PolicyScope::Api);
        assert_eq!(c.scope_for("/dashboard"), PolicyScope::Default);
    }

    #[test]
    fn auth_routes_are_api_class() {
        let c = classifier();
        assert!(c.is_api("/api/auth/login"));
        assert!(c.is_api("/api/widgets"));
        assert!(!c.is_api("/assets/app.js"));
    }

    #[test]
    fn exemption_is_exact_match() {
        let c = classifier();
        assert!(c.is_exempt("/health"));
        assert!(!c.is_exempt("/health/deep"));
    }

    #[test]
    fn identity_prefers_principal_only_by_identity() {
        let addr: IpAddr = "10.0.0.7".parse().unwrap();
        let principal = Principal { id: "u-42".to_string() };

        let by_id = IdentityKey::derive(KeyStrategy::ByIdentity, Some(&principal), addr);
        assert_eq!(by_id.as_str(), "user:u-42");

        let anon = IdentityKey::derive(KeyStrategy::ByIdentity, None, addr);
        assert_eq!(anon.as_str(), "addr:10.0.0.7");

        let by_addr = IdentityKey::derive(KeyStrategy::ByNetworkAddress, Some(&principal), addr);
        assert_eq!(by_addr.as_str(), "addr:10.0.0.7");
    }

    #[test]
    fn policy_set_maps_scopes() {
        let set = PolicySet::from_config(&RateLimitConfig::default());
        assert_eq!(set.policy(PolicyScope::Api).max_requests, 60);
        assert_eq!(
            set.policy(PolicyScope::AuthSensitive).window,
            Duration::from_millis(900_000)
        );
    }
}
