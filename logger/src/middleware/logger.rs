use std::{rc::Rc, time::Instant};

use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::{self, BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use colored::Colorize;
use common::identity::Identity;
use futures::future::{LocalBoxFuture, Ready, ready};
use log::{debug, info};

/// Logs one line per request: status, method, path, latency and the caller.
pub struct LoggerMiddleware {
    enabled: bool,
}

impl LoggerMiddleware {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
    <B as MessageBody>::Error: ResponseError,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
            enabled: self.enabled,
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
    enabled: bool,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
    <B as MessageBody>::Error: ResponseError,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        if !self.enabled {
            return Box::pin(async move { srv.call(req).await.map(|res| res.map_into_boxed_body()) });
        }

        let method = req.method().to_string();
        let path = req.path().to_string();
        let query_string = req.query_string().to_string();
        let caller = req
            .extensions()
            .get::<Identity>()
            .map(|identity| identity.to_string())
            .unwrap_or_else(|| "None".to_string());
        let started = Instant::now();

        Box::pin(async move {
            let res = srv.call(req).await?;
            let elapsed_ms = started.elapsed().as_millis();
            let status = res.status();
            info!(
                "{}",
                format_line(status.as_u16(), &method, &path, &query_string, elapsed_ms, &caller)
            );

            if !status.is_client_error() && !status.is_server_error() {
                return Ok(res.map_into_boxed_body());
            }

            // Copy error body and reconstruct response
            let (req, res) = res.into_parts();
            let headers = res.headers().clone();
            let body_bytes = body::to_bytes(res.into_body()).await?;
            debug!(
                "  Response: {}",
                String::from_utf8_lossy(&body_bytes).bright_yellow()
            );
            let mut new_res = HttpResponse::build(status);
            for (key, value) in headers.iter() {
                new_res.insert_header((key.clone(), value.clone()));
            }
            Ok(ServiceResponse::new(req, new_res.body(body_bytes)))
        })
    }
}

fn format_line(
    status_code: u16,
    method: &str,
    path: &str,
    query_string: &str,
    elapsed_ms: u128,
    caller: &str,
) -> String {
    let colored_status = match status_code {
        200..=299 => status_code.to_string().green(),
        300..=399 => status_code.to_string().yellow(),
        400..=499 => status_code.to_string().bright_red(),
        _ => status_code.to_string().red(),
    };

    let colored_method = match method {
        "GET" => method.blue(),
        "POST" => method.yellow(),
        "PUT" => method.purple(),
        "DELETE" => method.red(),
        _ => method.normal(),
    };

    let target = if query_string.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query_string)
    };

    format!(
        "[{}] {} {} {} caller={}",
        colored_status,
        colored_method,
        target.bright_white(),
        format!("({}ms)", elapsed_ms).bright_black(),
        caller.bright_blue(),
    )
}
