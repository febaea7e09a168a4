use actix_web::{HttpResponse, http::StatusCode};
use serde::Serialize;

use super::error::Res;

pub struct Success;
impl Success {
    pub fn ok<T: Serialize>(body: T) -> Res<HttpResponse> {
        Result::Ok(HttpResponse::Ok().json(body))
    }

    /// JSON reply with an explicit status, used where a denial still carries a
    /// structured body the client renders (e.g. a quota reason).
    pub fn with_status<T: Serialize>(status: StatusCode, body: T) -> Res<HttpResponse> {
        Result::Ok(HttpResponse::build(status).json(body))
    }
}
