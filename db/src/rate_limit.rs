use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

/// Number of recorded requests for `(identity, endpoint)` at or after `since`.
pub async fn count_requests_since<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    identity: &str,
    endpoint: &str,
    since: DateTime<Utc>,
) -> Res<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM rate_limits WHERE user_id = $1 AND endpoint = $2 AND requested_at >= $3",
    )
    .bind(identity)
    .bind(endpoint)
    .bind(since)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_request<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    identity: &str,
    endpoint: &str,
    requested_at: DateTime<Utc>,
) -> Res<()> {
    sqlx::query("INSERT INTO rate_limits (user_id, endpoint, requested_at) VALUES ($1, $2, $3)")
        .bind(identity)
        .bind(endpoint)
        .bind(requested_at)
        .execute(executor)
        .await
        .map_err(AppError::from)?;
    Ok(())
}
