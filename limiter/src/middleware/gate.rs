use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::{error::AppError, identity::Identity};
use std::{future::Future, pin::Pin, rc::Rc};

use crate::gate::{RateGate, endpoint_key};

/// Applies the rate gate to every request whose path has a configured limit.
pub struct RateGateMiddleware {
    gate: RateGate,
}

impl RateGateMiddleware {
    pub fn new(gate: RateGate) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateGateMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = RateGateService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateGateService {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct RateGateService<S> {
    service: Rc<S>,
    gate: RateGate,
}

impl<S, B> Service<ServiceRequest> for RateGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let gate = self.gate.clone();

        Box::pin(async move {
            let endpoint = endpoint_key(req.path()).to_string();
            if gate.limit_for(&endpoint).is_none() {
                return srv.call(req).await.map(|res| res.map_into_boxed_body());
            }

            let identity = req.extensions().get::<Identity>().cloned();
            let identity = identity.unwrap_or_else(|| {
                Identity::Ip(
                    req.peer_addr()
                        .map(|addr| addr.ip().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                )
            });

            if gate.allow(&endpoint, &identity).await {
                srv.call(req).await.map(|res| res.map_into_boxed_body())
            } else {
                Ok(req.error_response(AppError::TooManyRequests(
                    "Rate limit exceeded. Please try again later.".to_string(),
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, HttpResponse, http::StatusCode, test::{self as http_test}, web};
    use db::memory::MemoryStore;

    use super::*;
    use crate::gate::RateLimits;

    #[actix_web::test]
    async fn limited_path_returns_429_after_limit() {
        let store = Arc::new(MemoryStore::new());
        let gate = RateGate::new(
            store.clone(),
            RateLimits::new([("/api/advisor-chat".to_string(), 2)]),
        );
        let app = http_test::init_service(
            App::new()
                .wrap(RateGateMiddleware::new(gate))
                .route("/api/advisor-chat", web::post().to(|| async { HttpResponse::Ok().finish() }))
                .route("/api/resources", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let statuses = {
            let mut statuses = Vec::new();
            for _ in 0..3 {
                let req = http_test::TestRequest::post()
                    .uri("/api/advisor-chat")
                    .peer_addr("192.0.2.10:5000".parse().unwrap())
                    .to_request();
                statuses.push(http_test::call_service(&app, req).await.status());
            }
            statuses
        };
        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );

        // unlimited paths are untouched
        for _ in 0..3 {
            let req = http_test::TestRequest::get()
                .uri("/api/resources")
                .peer_addr("192.0.2.10:5000".parse().unwrap())
                .to_request();
            assert_eq!(
                http_test::call_service(&app, req).await.status(),
                StatusCode::OK
            );
        }
        assert_eq!(store.rate_limit_records().len(), 2);
    }

    #[actix_web::test]
    async fn trailing_slash_counts_against_the_same_limit() {
        let store = Arc::new(MemoryStore::new());
        let gate = RateGate::new(
            store.clone(),
            RateLimits::new([("/api/deep-dive".to_string(), 1)]),
        );
        let app = http_test::init_service(
            App::new()
                .wrap(RateGateMiddleware::new(gate))
                .route("/api/deep-dive", web::post().to(|| async { HttpResponse::Ok().finish() }))
                .route("/api/deep-dive/", web::post().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let mut statuses = Vec::new();
        for uri in ["/api/deep-dive", "/api/deep-dive/"] {
            let req = http_test::TestRequest::post()
                .uri(uri)
                .peer_addr("192.0.2.11:5000".parse().unwrap())
                .to_request();
            statuses.push(http_test::call_service(&app, req).await.status());
        }
        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);

        let records = store.rate_limit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint, "/api/deep-dive");
    }
}
