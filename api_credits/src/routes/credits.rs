use std::sync::Arc;

use actix_web::{HttpResponse, get, http::StatusCode, post, web};
use common::{
    error::{AppError, Res},
    http::Success,
    identity::Identity,
};
use db::{models::credits::FeatureType, store::CreditStore};

use crate::{
    dtos::credits::{ConsumeRequest, ConsumeResponse, CreditsResponse},
    services::ledger::{self, ConsumeReason},
};

/// Returns the caller's credit balances and one-time purchases.
///
/// Users without an account get the default free account, which is
/// persisted on this first read.
///
/// # Output
/// - Success: `{subscriptionTier, subscriptionStatus, deepDiveCreditsRemaining,
///   launchKitCreditsRemaining, oneTimePurchases, creditsResetAt}`
/// - Error: 401 when the caller is not signed in
#[get("")]
pub async fn get_credits(
    identity: Identity,
    store: web::Data<Arc<dyn CreditStore>>,
) -> Res<HttpResponse> {
    let user_id = identity.user_id()?;
    let account = store.get_or_create_credits(user_id).await?;
    Success::ok(CreditsResponse::from(account))
}

/// Unlocks a feature for one idea, spending a credit when needed.
///
/// # Input
/// `{"type": "deep_dive" | "launch_kit", "ideaId": "..."}`
///
/// # Output
/// - 200 `{consumed, reason, creditsRemaining?}` when access is granted
/// - 400 for a missing idea id or unknown type
/// - 401 when the caller is not signed in
/// - 403 `{consumed: false, reason, error}` when no credits or subscription allow it
/// - 404 when the caller has no credit account yet
#[post("/consume")]
pub async fn post_consume(
    identity: Identity,
    store: web::Data<Arc<dyn CreditStore>>,
    req: web::Json<ConsumeRequest>,
) -> Res<HttpResponse> {
    let user_id = identity.user_id()?;
    let req = req.into_inner();

    let feature = req
        .feature
        .as_deref()
        .and_then(FeatureType::parse)
        .ok_or_else(|| {
            AppError::BadRequest("type must be one of deep_dive, launch_kit".to_string())
        })?;
    let idea_id = req
        .idea_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("ideaId is required".to_string()))?;

    let outcome = ledger::check_and_consume(store.get_ref().as_ref(), user_id, feature, idea_id).await?;

    if outcome.granted {
        return Success::ok(ConsumeResponse {
            consumed: outcome.consumed,
            reason: Some(outcome.reason),
            credits_remaining: outcome.credits_remaining,
            error: None,
        });
    }

    match outcome.reason {
        ConsumeReason::NoAccount => Err(AppError::NotFound(
            "No credit record found for user".to_string(),
        )),
        reason => {
            let message = match reason {
                ConsumeReason::NoCreditsRemaining => "No credits remaining for this feature",
                _ => "An active subscription or purchase is required",
            };
            Success::with_status(
                StatusCode::FORBIDDEN,
                ConsumeResponse {
                    consumed: false,
                    reason: Some(reason),
                    credits_remaining: None,
                    error: Some(message.to_string()),
                },
            )
        }
    }
}
