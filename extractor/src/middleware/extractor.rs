use std::{future::Future, net::IpAddr, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::HeaderMap,
};
use futures::future::{Ready, ok};

use common::{identity::Identity, jwt};

/// Resolves the caller identity once per request and stores it in the
/// request extensions for the limiter, the logger and the handlers.
pub struct ExtractionMiddleware {
    jwt_secret: Rc<String>,
    trust_forwarded_for: bool,
}

impl ExtractionMiddleware {
    pub fn new(jwt_secret: String, trust_forwarded_for: bool) -> Self {
        Self {
            jwt_secret: Rc::new(jwt_secret),
            trust_forwarded_for,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ExtractionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = ExtractionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ExtractionMiddlewareService {
            service: Arc::new(service),
            jwt_secret: self.jwt_secret.clone(),
            trust_forwarded_for: self.trust_forwarded_for,
        })
    }
}

pub struct ExtractionMiddlewareService<S> {
    service: Arc<S>,
    jwt_secret: Rc<String>,
    trust_forwarded_for: bool,
}

impl<S, B> Service<ServiceRequest> for ExtractionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let identity = resolve_identity(
            req.headers(),
            req.peer_addr().map(|addr| addr.ip()),
            &self.jwt_secret,
            self.trust_forwarded_for,
        );
        req.extensions_mut().insert(identity);

        let srv = Arc::clone(&self.service);
        Box::pin(async move { srv.call(req).await.map(|res| res.map_into_boxed_body()) })
    }
}

/// A valid bearer token wins; otherwise the caller is identified by address.
pub fn resolve_identity(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    jwt_secret: &str,
    trust_forwarded_for: bool,
) -> Identity {
    // retrieve token from authorization header
    let token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if let Some(token) = token {
        match jwt::validate_jwt(token, jwt_secret) {
            Ok(claims) => return Identity::User(claims.user_id),
            Err(e) => log::debug!("Ignoring invalid bearer token: {}", e),
        }
    }

    // the right-most hop is the one appended by our own proxy; anything to
    // its left is client supplied
    let forwarded = if trust_forwarded_for {
        headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.rsplit(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .map(str::to_string)
    } else {
        None
    };

    Identity::Ip(
        forwarded
            .or_else(|| peer.map(|ip| ip.to_string()))
            .unwrap_or_else(|| "unknown".to_string()),
    )
}
