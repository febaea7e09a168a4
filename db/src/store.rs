//! Store interfaces the services are written against. A single [`PgStore`]
//! is built at startup and shared by every worker; tests swap in the
//! in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::Res;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::{credits::SubscriptionUpdate, listing::ListingFilter},
    models::{
        credits::{CreditAccount, FeatureType},
        listing::ResourceListing,
    },
};

/// Access to the `user_credits` collection.
#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn get_credits(&self, user_id: Uuid) -> Res<Option<CreditAccount>>;

    /// Returns the account, inserting the default free account first if the
    /// user has none.
    async fn get_or_create_credits(&self, user_id: Uuid) -> Res<CreditAccount>;

    /// Atomically takes one credit of `feature`. `None` means nothing was
    /// taken because the counter was already zero.
    async fn decrement_credit(&self, user_id: Uuid, feature: FeatureType) -> Res<Option<i32>>;

    async fn apply_subscription(&self, update: SubscriptionUpdate) -> Res<CreditAccount>;

    async fn add_purchase(&self, user_id: Uuid, purchase_key: &str) -> Res<()>;
}

/// Access to the append-only `rate_limits` collection.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn count_since(&self, identity: &str, endpoint: &str, since: DateTime<Utc>)
    -> Res<i64>;

    async fn record(&self, identity: &str, endpoint: &str, at: DateTime<Utc>) -> Res<()>;
}

/// Read access to `resource_listings`.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// One page of matches plus the total match count.
    async fn search(&self, filter: &ListingFilter) -> Res<(Vec<ResourceListing>, i64)>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditStore for PgStore {
    async fn get_credits(&self, user_id: Uuid) -> Res<Option<CreditAccount>> {
        crate::credits::get_credits_by_user_id(&*self.pool, user_id).await
    }

    async fn get_or_create_credits(&self, user_id: Uuid) -> Res<CreditAccount> {
        if let Some(account) = crate::credits::get_credits_by_user_id(&*self.pool, user_id).await? {
            return Ok(account);
        }
        crate::credits::insert_default_credits(&*self.pool, user_id).await?;
        log::info!("Created default credit account for user {}", user_id);
        Ok(crate::credits::get_credits_by_user_id(&*self.pool, user_id)
            .await?
            .unwrap_or_else(|| CreditAccount::free(user_id)))
    }

    async fn decrement_credit(&self, user_id: Uuid, feature: FeatureType) -> Res<Option<i32>> {
        crate::credits::decrement_credit(&*self.pool, user_id, feature).await
    }

    async fn apply_subscription(&self, update: SubscriptionUpdate) -> Res<CreditAccount> {
        crate::credits::upsert_subscription(&*self.pool, update).await
    }

    async fn add_purchase(&self, user_id: Uuid, purchase_key: &str) -> Res<()> {
        crate::credits::add_one_time_purchase(&*self.pool, user_id, purchase_key).await
    }
}

#[async_trait]
impl RateLimitStore for PgStore {
    async fn count_since(
        &self,
        identity: &str,
        endpoint: &str,
        since: DateTime<Utc>,
    ) -> Res<i64> {
        crate::rate_limit::count_requests_since(&*self.pool, identity, endpoint, since).await
    }

    async fn record(&self, identity: &str, endpoint: &str, at: DateTime<Utc>) -> Res<()> {
        crate::rate_limit::insert_request(&*self.pool, identity, endpoint, at).await
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn search(&self, filter: &ListingFilter) -> Res<(Vec<ResourceListing>, i64)> {
        let listings = crate::listing::search_listings(&*self.pool, filter).await?;
        let total = crate::listing::count_listings(&*self.pool, filter).await?;
        Ok((listings, total))
    }
}
