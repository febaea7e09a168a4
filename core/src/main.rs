mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::env_config::Config;
use db::store::{CreditStore, ListingStore, PgStore, RateLimitStore};
use limiter::gate::{RateGate, RateLimits};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Arc::new(Config::from_env());

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config.log_file).expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config.database_url, config.is_production())
        .await
        .expect("Failed to set up database");

    // one store behind every trait
    let store = Arc::new(PgStore::new(pool));
    let credit_store: Arc<dyn CreditStore> = store.clone();
    let listing_store: Arc<dyn ListingStore> = store.clone();
    let rate_store: Arc<dyn RateLimitStore> = store;
    let gate = RateGate::new(rate_store, RateLimits::new(config.rate_limits.clone()));

    log::info!(
        "Starting server on {}:{} ({} rate-limited endpoints)",
        config.server_host,
        config.server_port,
        config.rate_limits.len()
    );

    let config_data = Arc::clone(&config);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&config_data)))
            .app_data(web::Data::new(Arc::clone(&credit_store)))
            .app_data(web::Data::new(Arc::clone(&listing_store)))
            .wrap(limiter::middleware(gate.clone())) // 4th
            .wrap(logger::middleware(&config_data)) // 3rd
            .wrap(extractor::middleware(&config_data)) // 2nd
            .wrap(cors::middleware(&config_data.cors_allowed_origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_credits::mount_credits())
                    .service(api_credits::mount_billing())
                    .service(api_resources::mount_resources()),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
