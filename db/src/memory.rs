//! In-process store used by tests across the workspace.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use uuid::Uuid;

use crate::{
    dtos::{credits::SubscriptionUpdate, listing::ListingFilter},
    models::{
        credits::{CreditAccount, FeatureType},
        listing::ResourceListing,
        rate_limit::RateLimitRecord,
    },
    store::{CreditStore, ListingStore, RateLimitStore},
};

#[derive(Default)]
struct State {
    credits: HashMap<Uuid, CreditAccount>,
    rate_limits: Vec<RateLimitRecord>,
    listings: Vec<ResourceListing>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    drain_before_decrement: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, account: CreditAccount) -> Self {
        self.lock().credits.insert(account.user_id, account);
        self
    }

    pub fn with_listings(self, listings: Vec<ResourceListing>) -> Self {
        self.lock().listings = listings;
        self
    }

    /// Makes every read fail as if the database were unreachable.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every write fail as if the database were unreachable.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every decrement find its counter already at zero, as when a
    /// concurrent request spent the last credit after the caller read it.
    pub fn drain_before_decrement(&self, drain: bool) {
        self.drain_before_decrement.store(drain, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn account(&self, user_id: Uuid) -> Option<CreditAccount> {
        self.lock().credits.get(&user_id).cloned()
    }

    pub fn rate_limit_records(&self) -> Vec<RateLimitRecord> {
        self.lock().rate_limits.clone()
    }

    /// Seeds a past request without counting it as a write.
    pub fn push_record(&self, record: RateLimitRecord) {
        self.lock().rate_limits.push(record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_read(&self) -> Res<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn check_write(&self) -> Res<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn get_credits(&self, user_id: Uuid) -> Res<Option<CreditAccount>> {
        self.check_read()?;
        Ok(self.lock().credits.get(&user_id).cloned())
    }

    async fn get_or_create_credits(&self, user_id: Uuid) -> Res<CreditAccount> {
        if let Some(account) = self.get_credits(user_id).await? {
            return Ok(account);
        }
        self.check_write()?;
        Ok(self
            .lock()
            .credits
            .entry(user_id)
            .or_insert_with(|| CreditAccount::free(user_id))
            .clone())
    }

    async fn decrement_credit(&self, user_id: Uuid, feature: FeatureType) -> Res<Option<i32>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.lock();
        let Some(account) = state.credits.get_mut(&user_id) else {
            return Ok(None);
        };
        let counter = match feature {
            FeatureType::DeepDive => &mut account.deep_dive_credits_remaining,
            FeatureType::LaunchKit => &mut account.launch_kit_credits_remaining,
        };
        if self.drain_before_decrement.load(Ordering::SeqCst) {
            *counter = 0;
        }
        if *counter <= 0 {
            return Ok(None);
        }
        *counter -= 1;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(*counter))
    }

    async fn apply_subscription(&self, update: SubscriptionUpdate) -> Res<CreditAccount> {
        self.check_write()?;
        let mut state = self.lock();
        let account = state
            .credits
            .entry(update.user_id)
            .or_insert_with(|| CreditAccount::free(update.user_id));
        let new_period = update.period_end.is_some() && account.credits_reset_at != update.period_end;
        let tier_changed = account.subscription_tier != update.tier;
        if let Some((deep_dive, launch_kit)) = update.allotment {
            if new_period || tier_changed {
                account.deep_dive_credits_remaining = deep_dive;
                account.launch_kit_credits_remaining = launch_kit;
            }
        }
        account.subscription_tier = update.tier;
        account.subscription_status = update.status;
        if update.period_end.is_some() {
            account.credits_reset_at = update.period_end;
        }
        Ok(account.clone())
    }

    async fn add_purchase(&self, user_id: Uuid, purchase_key: &str) -> Res<()> {
        self.check_write()?;
        let mut state = self.lock();
        let account = state
            .credits
            .entry(user_id)
            .or_insert_with(|| CreditAccount::free(user_id));
        if !account.has_purchased(purchase_key) {
            account.one_time_purchases.push(purchase_key.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn count_since(
        &self,
        identity: &str,
        endpoint: &str,
        since: DateTime<Utc>,
    ) -> Res<i64> {
        self.check_read()?;
        Ok(self
            .lock()
            .rate_limits
            .iter()
            .filter(|r| r.user_id == identity && r.endpoint == endpoint && r.requested_at >= since)
            .count() as i64)
    }

    async fn record(&self, identity: &str, endpoint: &str, at: DateTime<Utc>) -> Res<()> {
        self.check_write()?;
        self.lock().rate_limits.push(RateLimitRecord {
            user_id: identity.to_string(),
            endpoint: endpoint.to_string(),
            requested_at: at,
        });
        Ok(())
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn search(&self, filter: &ListingFilter) -> Res<(Vec<ResourceListing>, i64)> {
        self.check_read()?;
        let mut matches: Vec<ResourceListing> = self
            .lock()
            .listings
            .iter()
            .filter(|listing| matches_filter(listing, filter))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.is_featured
                .cmp(&a.is_featured)
                .then_with(|| a.name.cmp(&b.name))
        });
        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

fn matches_filter(listing: &ResourceListing, filter: &ListingFilter) -> bool {
    let contains = |field: &Option<String>, needle: &str| {
        field
            .as_deref()
            .is_some_and(|value| value.to_lowercase().contains(needle))
    };
    if let Some(query) = &filter.query {
        let needle = query.to_lowercase();
        if !(listing.name.to_lowercase().contains(&needle)
            || contains(&listing.short_description, &needle)
            || contains(&listing.long_description, &needle))
        {
            return false;
        }
    }
    if filter.category.as_ref().is_some_and(|c| *c != listing.category) {
        return false;
    }
    if filter.state.is_some() && filter.state != listing.state {
        return false;
    }
    if filter.remote_only && !(listing.is_remote || listing.is_nationwide) {
        return false;
    }
    if !filter.cause_areas.is_empty()
        && !filter.cause_areas.iter().any(|c| listing.cause_areas.contains(c))
    {
        return false;
    }
    if let Some(subcategory) = &filter.subcategory {
        if !listing.subcategories.contains(subcategory) {
            return false;
        }
    }
    true
}
