use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
};
use db::store::CreditStore;

use crate::services;

/// Receives Stripe webhook events and applies them to credit accounts.
///
/// Called by Stripe, not by the frontend. Handled events:
/// - `customer.subscription.created` / `customer.subscription.updated`:
///   tier, status and (on a new period) credit allotment
/// - `customer.subscription.deleted`: back to the free tier
/// - `checkout.session.completed` (payment mode): one-time deep dive or
///   launch kit purchase
///
/// # Output
/// - 200 once the event is processed or deliberately ignored
/// - 400 for a missing or invalid `stripe-signature`
/// - 500 when the account update fails, so Stripe retries delivery
#[post("/webhook")]
pub async fn post_webhook(
    payload: String,
    req: HttpRequest,
    config: web::Data<Arc<Config>>,
    store: web::Data<Arc<dyn CreditStore>>,
) -> Res<HttpResponse> {
    let signature = match req.headers().get("stripe-signature") {
        Some(signature) => signature.to_str().unwrap_or(""),
        None => return Err(AppError::BadRequest("Stripe signature missing".to_string())),
    };

    let event = services::billing::construct_event(
        &payload,
        signature,
        &config.billing.stripe_webhook_secret,
    )?;
    if let Some(action) = services::billing::action_for_event(event, &config.billing) {
        services::billing::apply_action(store.get_ref().as_ref(), action).await?;
    }

    Success::ok("Webhook processed successfully")
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test::{self as http_test}};
    use common::env_config::{BillingConfig, JwtConfig, default_rate_limits};
    use db::memory::MemoryStore;

    use super::*;

    fn config() -> Arc<Config> {
        Arc::new(Config {
            environment: "development".to_string(),
            database_url: "postgres://localhost/launchpad_test".to_string(),
            jwt_config: JwtConfig {
                secret: "billing-secret".to_string(),
            },
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            num_workers: 1,
            cors_allowed_origin: "http://localhost:3000".to_string(),
            console_logging_enabled: false,
            log_file: "launchpad.log".to_string(),
            trust_forwarded_for: false,
            billing: BillingConfig {
                stripe_webhook_secret: "whsec_test".to_string(),
                ..Default::default()
            },
            rate_limits: default_rate_limits(),
        })
    }

    #[actix_web::test]
    async fn unsigned_or_badly_signed_events_are_rejected() {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn CreditStore> = memory.clone();
        let app = http_test::init_service(
            App::new()
                .app_data(web::Data::new(config()))
                .app_data(web::Data::new(store))
                .service(crate::mount_billing()),
        )
        .await;
        let payload = r#"{"id":"evt_1","type":"customer.subscription.created"}"#;

        let req = http_test::TestRequest::post()
            .uri("/billing/webhook")
            .set_payload(payload)
            .to_request();
        assert_eq!(
            http_test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = http_test::TestRequest::post()
            .uri("/billing/webhook")
            .insert_header(("stripe-signature", "t=1700000000,v1=deadbeef"))
            .set_payload(payload)
            .to_request();
        let res = http_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = http_test::read_body_json(res).await;
        assert!(body["error"].as_str().is_some_and(|e| e.contains("Webhook Error")));

        assert_eq!(memory.writes(), 0);
    }
}
