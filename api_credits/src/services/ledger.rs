use common::error::Res;
use db::{models::credits::{FeatureType, SubscriptionTier}, store::CreditStore};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumeReason {
    AlreadyPurchased,
    Unlimited,
    CreditConsumed,
    NoCreditsRemaining,
    NoSubscription,
    NoAccount,
}

impl ConsumeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumeReason::AlreadyPurchased => "already_purchased",
            ConsumeReason::Unlimited => "unlimited",
            ConsumeReason::CreditConsumed => "credit_consumed",
            ConsumeReason::NoCreditsRemaining => "no_credits_remaining",
            ConsumeReason::NoSubscription => "no_subscription",
            ConsumeReason::NoAccount => "no_account",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub granted: bool,
    pub consumed: bool,
    pub reason: ConsumeReason,
    /// New balance, only set when a credit was taken.
    pub credits_remaining: Option<i32>,
}

impl ConsumeOutcome {
    fn granted(reason: ConsumeReason) -> Self {
        Self {
            granted: true,
            consumed: false,
            reason,
            credits_remaining: None,
        }
    }

    fn denied(reason: ConsumeReason) -> Self {
        Self {
            granted: false,
            consumed: false,
            reason,
            credits_remaining: None,
        }
    }
}

/// Decides whether `user_id` may use `feature` on `resource_id`, taking one
/// metered credit when that is what grants access.
///
/// Checks run in order and stop at the first match: one-time purchase,
/// active ignite (unlimited), active spark (metered), otherwise denied. Only
/// the metered branch writes. A failed write is returned as an error and
/// nothing is granted.
///
/// The decrement is a single guarded update, not a compare-and-swap loop, so
/// two concurrent calls can both pass the balance check against the same
/// last credit; the guard only keeps the counter from going negative.
pub async fn check_and_consume(
    store: &dyn CreditStore,
    user_id: Uuid,
    feature: FeatureType,
    resource_id: &str,
) -> Res<ConsumeOutcome> {
    let Some(account) = store.get_credits(user_id).await? else {
        return Ok(ConsumeOutcome::denied(ConsumeReason::NoAccount));
    };

    if account.has_purchased(&feature.purchase_key(resource_id)) {
        return Ok(ConsumeOutcome::granted(ConsumeReason::AlreadyPurchased));
    }

    if account.is_active(SubscriptionTier::Ignite) {
        return Ok(ConsumeOutcome::granted(ConsumeReason::Unlimited));
    }

    if account.is_active(SubscriptionTier::Spark) {
        if account.credits_for(feature) <= 0 {
            return Ok(ConsumeOutcome::denied(ConsumeReason::NoCreditsRemaining));
        }
        return match store.decrement_credit(user_id, feature).await? {
            Some(remaining) => {
                log::info!(
                    "User {} consumed a {} credit for {} ({} left)",
                    user_id,
                    feature.as_str(),
                    resource_id,
                    remaining
                );
                Ok(ConsumeOutcome {
                    granted: true,
                    consumed: true,
                    reason: ConsumeReason::CreditConsumed,
                    credits_remaining: Some(remaining),
                })
            }
            // another request took the last credit between read and update
            None => Ok(ConsumeOutcome::denied(ConsumeReason::NoCreditsRemaining)),
        };
    }

    Ok(ConsumeOutcome::denied(ConsumeReason::NoSubscription))
}

#[cfg(test)]
mod tests {
    use common::error::AppError;
    use db::{
        memory::MemoryStore,
        models::credits::{CreditAccount, SubscriptionStatus},
    };

    use super::*;

    fn account(tier: SubscriptionTier, status: SubscriptionStatus, deep_dive: i32) -> CreditAccount {
        CreditAccount {
            subscription_tier: tier,
            subscription_status: status,
            deep_dive_credits_remaining: deep_dive,
            launch_kit_credits_remaining: 1,
            ..CreditAccount::free(Uuid::new_v4())
        }
    }

    #[actix_web::test]
    async fn spark_scenario_consumes_then_denies() {
        let acc = account(SubscriptionTier::Spark, SubscriptionStatus::Active, 1);
        let user_id = acc.user_id;
        let store = MemoryStore::new().with_account(acc);

        let first = check_and_consume(&store, user_id, FeatureType::DeepDive, "idea-42")
            .await
            .unwrap();
        assert_eq!(
            first,
            ConsumeOutcome {
                granted: true,
                consumed: true,
                reason: ConsumeReason::CreditConsumed,
                credits_remaining: Some(0),
            }
        );
        let writes = store.writes();

        let second = check_and_consume(&store, user_id, FeatureType::DeepDive, "idea-42")
            .await
            .unwrap();
        assert!(!second.granted);
        assert_eq!(second.reason, ConsumeReason::NoCreditsRemaining);
        assert_eq!(store.writes(), writes);
        assert_eq!(store.account(user_id).unwrap().deep_dive_credits_remaining, 0);
    }

    #[actix_web::test]
    async fn lost_decrement_race_denies_without_going_negative() {
        let acc = account(SubscriptionTier::Spark, SubscriptionStatus::Active, 1);
        let user_id = acc.user_id;
        let store = MemoryStore::new().with_account(acc);
        store.drain_before_decrement(true);

        let outcome = check_and_consume(&store, user_id, FeatureType::DeepDive, "idea-42")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ConsumeOutcome::denied(ConsumeReason::NoCreditsRemaining)
        );
        assert_eq!(store.writes(), 0);
        assert_eq!(store.account(user_id).unwrap().deep_dive_credits_remaining, 0);
    }

    #[actix_web::test]
    async fn spark_counters_are_independent() {
        let acc = account(SubscriptionTier::Spark, SubscriptionStatus::Active, 3);
        let user_id = acc.user_id;
        let store = MemoryStore::new().with_account(acc);

        let outcome = check_and_consume(&store, user_id, FeatureType::LaunchKit, "idea-1")
            .await
            .unwrap();
        assert_eq!(outcome.credits_remaining, Some(0));
        let account = store.account(user_id).unwrap();
        assert_eq!(account.deep_dive_credits_remaining, 3);
        assert_eq!(account.launch_kit_credits_remaining, 0);
    }

    #[actix_web::test]
    async fn active_ignite_never_consumes() {
        for credits in [0, 5] {
            let acc = account(SubscriptionTier::Ignite, SubscriptionStatus::Active, credits);
            let user_id = acc.user_id;
            let store = MemoryStore::new().with_account(acc);
            for _ in 0..3 {
                let outcome = check_and_consume(&store, user_id, FeatureType::DeepDive, "idea-9")
                    .await
                    .unwrap();
                assert!(outcome.granted);
                assert!(!outcome.consumed);
                assert_eq!(outcome.reason, ConsumeReason::Unlimited);
            }
            assert_eq!(store.writes(), 0);
            assert_eq!(
                store.account(user_id).unwrap().deep_dive_credits_remaining,
                credits
            );
        }
    }

    #[actix_web::test]
    async fn purchase_short_circuits_tier_logic() {
        let mut acc = account(SubscriptionTier::Free, SubscriptionStatus::None, 0);
        acc.one_time_purchases = vec!["idea-7".to_string(), "launch_kit_idea-8".to_string()];
        let user_id = acc.user_id;
        let store = MemoryStore::new().with_account(acc);

        let deep_dive = check_and_consume(&store, user_id, FeatureType::DeepDive, "idea-7")
            .await
            .unwrap();
        assert_eq!(deep_dive.reason, ConsumeReason::AlreadyPurchased);
        assert!(deep_dive.granted && !deep_dive.consumed);

        let launch_kit = check_and_consume(&store, user_id, FeatureType::LaunchKit, "idea-8")
            .await
            .unwrap();
        assert_eq!(launch_kit.reason, ConsumeReason::AlreadyPurchased);

        // the deep-dive key does not unlock the launch kit
        let other = check_and_consume(&store, user_id, FeatureType::LaunchKit, "idea-7")
            .await
            .unwrap();
        assert_eq!(other.reason, ConsumeReason::NoSubscription);
    }

    #[actix_web::test]
    async fn purchased_idea_does_not_spend_spark_credits() {
        let mut acc = account(SubscriptionTier::Spark, SubscriptionStatus::Active, 2);
        acc.one_time_purchases = vec!["idea-3".to_string()];
        let user_id = acc.user_id;
        let store = MemoryStore::new().with_account(acc);

        let outcome = check_and_consume(&store, user_id, FeatureType::DeepDive, "idea-3")
            .await
            .unwrap();
        assert!(!outcome.consumed);
        assert_eq!(store.account(user_id).unwrap().deep_dive_credits_remaining, 2);
    }

    #[actix_web::test]
    async fn inactive_subscriptions_are_denied() {
        for (tier, status) in [
            (SubscriptionTier::Spark, SubscriptionStatus::PastDue),
            (SubscriptionTier::Ignite, SubscriptionStatus::Canceled),
            (SubscriptionTier::Free, SubscriptionStatus::Active),
        ] {
            let acc = account(tier, status, 5);
            let user_id = acc.user_id;
            let store = MemoryStore::new().with_account(acc);
            let outcome = check_and_consume(&store, user_id, FeatureType::DeepDive, "idea-1")
                .await
                .unwrap();
            assert_eq!(outcome.reason, ConsumeReason::NoSubscription);
            assert!(!outcome.granted);
            assert_eq!(store.writes(), 0);
        }
    }

    #[actix_web::test]
    async fn missing_account_is_denied() {
        let store = MemoryStore::new();
        let outcome = check_and_consume(&store, Uuid::new_v4(), FeatureType::DeepDive, "idea-1")
            .await
            .unwrap();
        assert_eq!(outcome, ConsumeOutcome::denied(ConsumeReason::NoAccount));
    }

    #[actix_web::test]
    async fn failed_decrement_grants_nothing() {
        let acc = account(SubscriptionTier::Spark, SubscriptionStatus::Active, 4);
        let user_id = acc.user_id;
        let store = MemoryStore::new().with_account(acc);
        store.fail_writes(true);

        let result = check_and_consume(&store, user_id, FeatureType::DeepDive, "idea-1").await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(store.account(user_id).unwrap().deep_dive_credits_remaining, 4);
    }

    #[actix_web::test]
    async fn failed_read_is_an_error() {
        let store = MemoryStore::new();
        store.fail_reads(true);
        let result = check_and_consume(&store, Uuid::new_v4(), FeatureType::DeepDive, "idea-1").await;
        assert!(result.is_err());
    }
}
