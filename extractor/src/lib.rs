use common::env_config::Config;
use middleware::extractor::ExtractionMiddleware;

pub mod middleware {
    pub mod extractor;
}

pub fn middleware(config: &Config) -> ExtractionMiddleware {
    ExtractionMiddleware::new(config.jwt_config.secret.clone(), config.trust_forwarded_for)
}
