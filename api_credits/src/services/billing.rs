use chrono::DateTime;
use common::{
    env_config::BillingConfig,
    error::{AppError, Res},
};
use db::{
    dtos::credits::SubscriptionUpdate,
    models::credits::{FeatureType, SubscriptionStatus, SubscriptionTier},
    store::CreditStore,
};
use stripe::{CheckoutSessionMode, Event, EventObject, EventType, Webhook};
use uuid::Uuid;

use crate::misc::billing::{metadata_value, status_from_stripe};

/// Account change derived from a billing event.
#[derive(Debug, Clone)]
pub enum BillingAction {
    Subscription(SubscriptionUpdate),
    Purchase { user_id: Uuid, purchase_key: String },
}

/// Creates an event for the webhook based on the request payload and signature.
/// Requires a webhook secret key.
pub fn construct_event(payload: &str, signature: &str, webhook_secret: &str) -> Res<Event> {
    match Webhook::construct_event(payload, signature, webhook_secret) {
        Ok(event) => Ok(event),
        Err(e) => {
            log::error!("Error constructing webhook event: {}", e);
            Err(AppError::BadRequest(format!("Webhook Error: {}", e)))
        }
    }
}

/// The parts of a Stripe event object the credit ledger cares about.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Subscription {
        user_id: Option<String>,
        price_id: Option<String>,
        status: SubscriptionStatus,
        period_end: i64,
    },
    Checkout {
        payment_mode: bool,
        client_reference_id: Option<String>,
        purchase_type: Option<String>,
        idea_id: Option<String>,
    },
    Other,
}

impl From<EventObject> for EventPayload {
    fn from(object: EventObject) -> Self {
        match object {
            EventObject::Subscription(subscription) => EventPayload::Subscription {
                user_id: metadata_value(&subscription.metadata, "user_id"),
                price_id: subscription
                    .items
                    .data
                    .first()
                    .and_then(|item| item.price.as_ref())
                    .map(|price| price.id.to_string()),
                status: status_from_stripe(&subscription.status),
                period_end: subscription.current_period_end,
            },
            EventObject::CheckoutSession(session) => EventPayload::Checkout {
                payment_mode: matches!(session.mode, CheckoutSessionMode::Payment),
                client_reference_id: session.client_reference_id,
                purchase_type: metadata_value(&session.metadata, "purchase_type"),
                idea_id: metadata_value(&session.metadata, "idea_id"),
            },
            _ => EventPayload::Other,
        }
    }
}

/// Maps a verified Stripe event onto an account change. Events that do not
/// concern credits, or that cannot be tied to a user, yield `None`.
pub fn action_for_event(event: Event, billing: &BillingConfig) -> Option<BillingAction> {
    log::info!("Processing webhook event: {}", event.type_);
    action_for(event.type_, event.data.object.into(), billing)
}

pub fn action_for(
    event_type: EventType,
    payload: EventPayload,
    billing: &BillingConfig,
) -> Option<BillingAction> {
    match (event_type, payload) {
        (
            EventType::CustomerSubscriptionCreated | EventType::CustomerSubscriptionUpdated,
            EventPayload::Subscription {
                user_id,
                price_id,
                status,
                period_end,
            },
        ) => {
            let user_id = parse_user_id(user_id.as_deref())?;
            Some(BillingAction::Subscription(subscription_update(
                user_id,
                tier_for_price(price_id.as_deref().unwrap_or_default(), billing),
                status,
                Some(period_end),
                billing,
            )))
        }
        (EventType::CustomerSubscriptionDeleted, EventPayload::Subscription { user_id, .. }) => {
            let user_id = parse_user_id(user_id.as_deref())?;
            Some(BillingAction::Subscription(cancellation(user_id)))
        }
        (
            EventType::CheckoutSessionCompleted,
            EventPayload::Checkout {
                payment_mode,
                client_reference_id,
                purchase_type,
                idea_id,
            },
        ) => {
            if !payment_mode {
                log::info!("Ignoring checkout session outside payment mode");
                return None;
            }
            purchase_action(
                client_reference_id.as_deref(),
                purchase_type.as_deref(),
                idea_id.as_deref(),
            )
        }
        (event_type, _) => {
            log::info!("Unhandled event type: {}", event_type);
            None
        }
    }
}

pub async fn apply_action(store: &dyn CreditStore, action: BillingAction) -> Res<()> {
    match action {
        BillingAction::Subscription(update) => {
            let user_id = update.user_id;
            let account = store.apply_subscription(update).await?;
            log::info!(
                "Subscription for user {} is now {} ({})",
                user_id,
                account.subscription_tier,
                account.subscription_status
            );
        }
        BillingAction::Purchase {
            user_id,
            purchase_key,
        } => {
            store.add_purchase(user_id, &purchase_key).await?;
            log::info!("Recorded purchase {} for user {}", purchase_key, user_id);
        }
    }
    Ok(())
}

pub fn tier_for_price(price_id: &str, billing: &BillingConfig) -> SubscriptionTier {
    if price_id.is_empty() {
        SubscriptionTier::Free
    } else if price_id == billing.ignite_price_id {
        SubscriptionTier::Ignite
    } else if price_id == billing.spark_price_id {
        SubscriptionTier::Spark
    } else {
        log::warn!("Price {} does not map to a subscription tier", price_id);
        SubscriptionTier::Free
    }
}

/// Spark is the only metered tier; every other tier carries zero counters.
pub fn subscription_update(
    user_id: Uuid,
    tier: SubscriptionTier,
    status: SubscriptionStatus,
    period_end: Option<i64>,
    billing: &BillingConfig,
) -> SubscriptionUpdate {
    let allotment = match tier {
        SubscriptionTier::Spark => (
            billing.spark_deep_dive_credits,
            billing.spark_launch_kit_credits,
        ),
        SubscriptionTier::Ignite | SubscriptionTier::Free => (0, 0),
    };
    SubscriptionUpdate {
        user_id,
        tier,
        status,
        period_end: period_end.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        allotment: Some(allotment),
    }
}

/// Subscription ended: back to free, balances left as they are.
pub fn cancellation(user_id: Uuid) -> SubscriptionUpdate {
    SubscriptionUpdate {
        user_id,
        tier: SubscriptionTier::Free,
        status: SubscriptionStatus::Canceled,
        period_end: None,
        allotment: None,
    }
}

pub fn purchase_action(
    client_reference_id: Option<&str>,
    purchase_type: Option<&str>,
    idea_id: Option<&str>,
) -> Option<BillingAction> {
    let user_id = parse_user_id(client_reference_id)?;
    let feature = purchase_type.and_then(FeatureType::parse)?;
    let idea_id = idea_id.map(str::trim).filter(|id| !id.is_empty())?;
    Some(BillingAction::Purchase {
        user_id,
        purchase_key: feature.purchase_key(idea_id),
    })
}

fn parse_user_id(value: Option<&str>) -> Option<Uuid> {
    match value.map(Uuid::parse_str) {
        Some(Ok(id)) => Some(id),
        Some(Err(e)) => {
            log::warn!("Billing event carries an invalid user id: {}", e);
            None
        }
        None => {
            log::warn!("Billing event has no user id, ignoring");
            None
        }
    }
}
