use chrono::{DateTime, Utc};
use db::models::credits::{CreditAccount, SubscriptionStatus, SubscriptionTier};
use serde::{Deserialize, Serialize};

use crate::services::ledger::ConsumeReason;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub deep_dive_credits_remaining: i32,
    pub launch_kit_credits_remaining: i32,
    pub one_time_purchases: Vec<String>,
    pub credits_reset_at: Option<DateTime<Utc>>,
}

impl From<CreditAccount> for CreditsResponse {
    fn from(account: CreditAccount) -> Self {
        CreditsResponse {
            subscription_tier: account.subscription_tier,
            subscription_status: account.subscription_status,
            deep_dive_credits_remaining: account.deep_dive_credits_remaining,
            launch_kit_credits_remaining: account.launch_kit_credits_remaining,
            one_time_purchases: account.one_time_purchases,
            credits_reset_at: account.credits_reset_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    #[serde(rename = "type")]
    pub feature: Option<String>,
    pub idea_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResponse {
    pub consumed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConsumeReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_remaining: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
