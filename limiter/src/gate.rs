use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use common::identity::Identity;
use db::store::RateLimitStore;

/// Length of the counting window.
pub fn window() -> Duration {
    Duration::hours(1)
}

/// Limit key for a request path: `/api/deep-dive/` and `/api/deep-dive` are
/// the same endpoint.
pub fn endpoint_key(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Per-hour request limits keyed by endpoint path.
#[derive(Debug, Clone, Default)]
pub struct RateLimits {
    limits: HashMap<String, u32>,
}

impl RateLimits {
    pub fn new(limits: impl IntoIterator<Item = (String, u32)>) -> Self {
        Self {
            limits: limits.into_iter().collect(),
        }
    }

    pub fn limit_for(&self, endpoint: &str) -> Option<u32> {
        self.limits.get(endpoint).copied()
    }
}

/// Fixed-window request counter backed by the `rate_limits` table.
///
/// Errors from the store never block a request: the gate logs them and lets
/// the request through.
#[derive(Clone)]
pub struct RateGate {
    store: Arc<dyn RateLimitStore>,
    limits: Arc<RateLimits>,
}

impl RateGate {
    pub fn new(store: Arc<dyn RateLimitStore>, limits: RateLimits) -> Self {
        Self {
            store,
            limits: Arc::new(limits),
        }
    }

    pub fn limit_for(&self, endpoint: &str) -> Option<u32> {
        self.limits.limit_for(endpoint)
    }

    pub async fn allow(&self, endpoint: &str, identity: &Identity) -> bool {
        self.allow_at(endpoint, identity, Utc::now()).await
    }

    /// Counts requests in `[now - 1h, now]`; rejected requests are not recorded.
    pub async fn allow_at(&self, endpoint: &str, identity: &Identity, now: DateTime<Utc>) -> bool {
        let Some(limit) = self.limits.limit_for(endpoint) else {
            return true;
        };
        let key = identity.rate_key();

        let count = match self.store.count_since(&key, endpoint, now - window()).await {
            Ok(count) => count,
            Err(e) => {
                log::warn!(
                    "Rate limit check failed for {} on {}, allowing request: {}",
                    key,
                    endpoint,
                    e
                );
                return true;
            }
        };

        if count >= i64::from(limit) {
            log::info!(
                "Rate limit reached for {} on {} ({}/{})",
                key,
                endpoint,
                count,
                limit
            );
            return false;
        }

        if let Err(e) = self.store.record(&key, endpoint, now).await {
            log::warn!(
                "Failed to record request for {} on {}, allowing request: {}",
                key,
                endpoint,
                e
            );
        }
        true
    }
}
