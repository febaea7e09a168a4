use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::credits::{SubscriptionStatus, SubscriptionTier};

/// Subscription state pushed by the billing provider.
#[derive(Debug, Clone)]
pub struct SubscriptionUpdate {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    /// End of the current billing period. `None` keeps the stored value.
    pub period_end: Option<DateTime<Utc>>,
    /// Per-period allotment `(deep_dive, launch_kit)`. Applied only when the
    /// tier changes or a new period starts; `None` leaves counters untouched.
    pub allotment: Option<(i32, i32)>,
}
