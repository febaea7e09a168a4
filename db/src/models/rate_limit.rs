use chrono::{DateTime, Utc};

/// One accepted request against a rate-limited endpoint.
#[derive(Debug, Clone)]
pub struct RateLimitRecord {
    /// User uuid or `ip:<address>`.
    pub user_id: String,
    pub endpoint: String,
    pub requested_at: DateTime<Utc>,
}
