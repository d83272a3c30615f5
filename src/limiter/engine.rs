//! Admission decisions over the counter store.

use std::sync::Arc;

use crate::config::schema::RateLimitConfig;
use crate::limiter::policy::{
    IdentityKey, PolicyScope, PolicySet, RateLimitPolicy, RouteClassifier,
};
use crate::limiter::store::CounterStore;

/// Outcome of evaluating one request against its scope's policy.
///
/// The engine performs no response I/O; translating a decision into an
/// HTTP rejection is the middleware's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { retry_after_secs: u64 },
}

/// Tiered rate limiter: one fixed-window policy per scope, all counting
/// delegated to the [`CounterStore`].
pub struct RateLimiter {
    policies: PolicySet,
    classifier: Arc<RouteClassifier>,
    store: Arc<CounterStore>,
}

impl RateLimiter {
    pub fn new(
        rate_limit: &RateLimitConfig,
        classifier: Arc<RouteClassifier>,
        store: Arc<CounterStore>,
    ) -> Self {
        Self {
            policies: PolicySet::from_config(rate_limit),
            classifier,
            store,
        }
    }

    pub fn classifier(&self) -> &RouteClassifier {
        &self.classifier
    }

    pub fn policy(&self, scope: PolicyScope) -> &RateLimitPolicy {
        self.policies.policy(scope)
    }

    /// Count this request and decide admission.
    ///
    /// Allow iff the post-increment count is within the scope's quota;
    /// otherwise deny with a retry hint of ceil(window remaining), at
    /// least one second. The increment is never rolled back, so an
    /// aborted caller overcounts rather than undercounts.
    pub async fn evaluate(&self, scope: PolicyScope, key: &IdentityKey) -> Decision {
        let policy = self.policies.policy(scope);
        let bucket = format!("{}:{}", scope.as_str(), key.as_str());
        let counted = self.store.increment(&bucket, policy.window).await;

        if counted.count <= policy.max_requests {
            Decision::Allow
        } else {
            let remaining_ms = counted.window_remaining.as_millis() as u64;
            Decision::Deny {
                retry_after_secs: remaining_ms.div_ceil(1000).max(1),
            }
        }
    }
}
