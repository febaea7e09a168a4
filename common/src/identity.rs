use std::{fmt, future::Ready};

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use uuid::Uuid;

use crate::error::{AppError, Res};

/// Who is calling: an authenticated user, or the client address when no
/// valid session token was presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(Uuid),
    Ip(String),
}

impl Identity {
    /// The authenticated user id, or `Unauthorized` for anonymous callers.
    pub fn user_id(&self) -> Res<Uuid> {
        match self {
            Identity::User(id) => Ok(*id),
            Identity::Ip(_) => Err(AppError::Unauthorized(
                "No authorization token provided".to_string(),
            )),
        }
    }

    /// Key stored in `rate_limits.user_id`.
    pub fn rate_key(&self) -> String {
        match self {
            Identity::User(id) => id.to_string(),
            Identity::Ip(addr) => format!("ip:{}", addr),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rate_key())
    }
}

/// Identity placed in the request extensions by the extraction middleware.
/// Falls back to the peer address when the middleware is not mounted.
impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<Identity>().cloned().unwrap_or_else(|| {
            Identity::Ip(
                req.peer_addr()
                    .map(|addr| addr.ip().to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            )
        });
        std::future::ready(Ok(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_callers_are_unauthorized() {
        let identity = Identity::Ip("10.0.0.1".to_string());
        assert!(matches!(identity.user_id(), Err(AppError::Unauthorized(_))));
        assert_eq!(identity.rate_key(), "ip:10.0.0.1");
    }

    #[test]
    fn user_rate_key_is_the_uuid() {
        let id = Uuid::new_v4();
        let identity = Identity::User(id);
        assert_eq!(identity.user_id().unwrap(), id);
        assert_eq!(identity.rate_key(), id.to_string());
    }
}
