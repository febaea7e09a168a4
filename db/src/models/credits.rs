use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Spark,
    Ignite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    None,
}

/// A metered feature that can be unlocked per idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    DeepDive,
    LaunchKit,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Spark => "spark",
            SubscriptionTier::Ignite => "ignite",
        }
    }
}

// Unknown values decode as the least privileged variant.
impl From<String> for SubscriptionTier {
    fn from(value: String) -> Self {
        match value.as_str() {
            "spark" => SubscriptionTier::Spark,
            "ignite" => SubscriptionTier::Ignite,
            _ => SubscriptionTier::Free,
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::None => "none",
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => SubscriptionStatus::Active,
            "canceled" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            _ => SubscriptionStatus::None,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::DeepDive => "deep_dive",
            FeatureType::LaunchKit => "launch_kit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deep_dive" => Some(FeatureType::DeepDive),
            "launch_kit" => Some(FeatureType::LaunchKit),
            _ => None,
        }
    }

    /// Key recorded in `one_time_purchases` when this feature is bought for
    /// a single idea. Deep dives use the bare idea id.
    pub fn purchase_key(&self, resource_id: &str) -> String {
        match self {
            FeatureType::DeepDive => resource_id.to_string(),
            FeatureType::LaunchKit => format!("launch_kit_{}", resource_id),
        }
    }

    /// Counter column in `user_credits`.
    pub(crate) fn counter_column(&self) -> &'static str {
        match self {
            FeatureType::DeepDive => "deep_dive_credits_remaining",
            FeatureType::LaunchKit => "launch_kit_credits_remaining",
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct CreditAccount {
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub subscription_tier: SubscriptionTier,
    #[sqlx(try_from = "String")]
    pub subscription_status: SubscriptionStatus,
    pub deep_dive_credits_remaining: i32,
    pub launch_kit_credits_remaining: i32,
    pub one_time_purchases: Vec<String>,
    pub credits_reset_at: Option<DateTime<Utc>>,
}

impl CreditAccount {
    /// The implicit account of a user nobody has billed yet.
    pub fn free(user_id: Uuid) -> Self {
        CreditAccount {
            user_id,
            subscription_tier: SubscriptionTier::Free,
            subscription_status: SubscriptionStatus::None,
            deep_dive_credits_remaining: 0,
            launch_kit_credits_remaining: 0,
            one_time_purchases: Vec::new(),
            credits_reset_at: None,
        }
    }

    pub fn credits_for(&self, feature: FeatureType) -> i32 {
        match feature {
            FeatureType::DeepDive => self.deep_dive_credits_remaining,
            FeatureType::LaunchKit => self.launch_kit_credits_remaining,
        }
    }

    pub fn has_purchased(&self, key: &str) -> bool {
        self.one_time_purchases.iter().any(|p| p == key)
    }

    pub fn is_active(&self, tier: SubscriptionTier) -> bool {
        self.subscription_tier == tier && self.subscription_status == SubscriptionStatus::Active
    }
}
