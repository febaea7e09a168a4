use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::credits::SubscriptionUpdate,
    models::credits::{CreditAccount, FeatureType},
};

const ACCOUNT_COLUMNS: &str = "user_id, subscription_tier, subscription_status, \
    deep_dive_credits_remaining, launch_kit_credits_remaining, one_time_purchases, credits_reset_at";

pub async fn get_credits_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<CreditAccount>> {
    sqlx::query_as::<_, CreditAccount>(&format!(
        "SELECT {} FROM user_credits WHERE user_id = $1",
        ACCOUNT_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Inserts the default free account unless one already exists.
pub async fn insert_default_credits<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<()> {
    sqlx::query("INSERT INTO user_credits (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(executor)
        .await
        .map_err(AppError::from)?;
    Ok(())
}

/// Takes one credit in a single statement. Returns the new balance, or `None`
/// when the account is missing or the counter is already at zero.
pub async fn decrement_credit<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    feature: FeatureType,
) -> Res<Option<i32>> {
    let column = feature.counter_column();
    sqlx::query_scalar::<_, i32>(&format!(
        "UPDATE user_credits SET {col} = {col} - 1, updated_at = now() \
         WHERE user_id = $1 AND {col} > 0 RETURNING {col}",
        col = column
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn upsert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    update: SubscriptionUpdate,
) -> Res<CreditAccount> {
    let (deep_dive, launch_kit) = match update.allotment {
        Some((d, l)) => (Some(d), Some(l)),
        None => (None, None),
    };
    sqlx::query_as::<_, CreditAccount>(&format!(
        r#"
        INSERT INTO user_credits (user_id, subscription_tier, subscription_status,
            deep_dive_credits_remaining, launch_kit_credits_remaining, credits_reset_at)
        VALUES ($1, $2, $3, COALESCE($4, 0), COALESCE($5, 0), $6)
        ON CONFLICT (user_id) DO UPDATE SET
            subscription_tier = EXCLUDED.subscription_tier,
            subscription_status = EXCLUDED.subscription_status,
            deep_dive_credits_remaining = CASE
                WHEN $4 IS NOT NULL AND (user_credits.subscription_tier <> EXCLUDED.subscription_tier
                    OR (EXCLUDED.credits_reset_at IS NOT NULL
                        AND user_credits.credits_reset_at IS DISTINCT FROM EXCLUDED.credits_reset_at))
                THEN $4 ELSE user_credits.deep_dive_credits_remaining END,
            launch_kit_credits_remaining = CASE
                WHEN $5 IS NOT NULL AND (user_credits.subscription_tier <> EXCLUDED.subscription_tier
                    OR (EXCLUDED.credits_reset_at IS NOT NULL
                        AND user_credits.credits_reset_at IS DISTINCT FROM EXCLUDED.credits_reset_at))
                THEN $5 ELSE user_credits.launch_kit_credits_remaining END,
            credits_reset_at = COALESCE(EXCLUDED.credits_reset_at, user_credits.credits_reset_at),
            updated_at = now()
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    ))
    .bind(update.user_id)
    .bind(update.tier.as_str())
    .bind(update.status.as_str())
    .bind(deep_dive)
    .bind(launch_kit)
    .bind(update.period_end)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Records a one-time purchase, creating the account when needed. Keys are
/// never duplicated.
pub async fn add_one_time_purchase<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    purchase_key: &str,
) -> Res<()> {
    sqlx::query(
        r#"
        INSERT INTO user_credits (user_id, one_time_purchases)
        VALUES ($1, ARRAY[$2::text])
        ON CONFLICT (user_id) DO UPDATE SET
            one_time_purchases = CASE
                WHEN $2::text = ANY(user_credits.one_time_purchases) THEN user_credits.one_time_purchases
                ELSE array_append(user_credits.one_time_purchases, $2::text) END,
            updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(purchase_key)
    .execute(executor)
    .await
    .map_err(AppError::from)?;
    Ok(())
}
