use db::models::credits::SubscriptionStatus;
use serde::Serialize;

/// Collapses Stripe's subscription lifecycle onto the statuses the ledger
/// understands. Trials count as active.
pub(crate) fn status_from_stripe(status: &stripe::SubscriptionStatus) -> SubscriptionStatus {
    match status {
        stripe::SubscriptionStatus::Active | stripe::SubscriptionStatus::Trialing => {
            SubscriptionStatus::Active
        }
        stripe::SubscriptionStatus::PastDue | stripe::SubscriptionStatus::Unpaid => {
            SubscriptionStatus::PastDue
        }
        stripe::SubscriptionStatus::Canceled | stripe::SubscriptionStatus::IncompleteExpired => {
            SubscriptionStatus::Canceled
        }
        _ => SubscriptionStatus::None,
    }
}

/// Reads one string entry from a Stripe metadata map (plain or optional).
pub(crate) fn metadata_value<M: Serialize>(metadata: &M, key: &str) -> Option<String> {
    let value = serde_json::to_value(metadata).ok()?;
    value.get(key)?.as_str().map(str::to_string)
}
