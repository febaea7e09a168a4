use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Res;

/// Claims carried by the session token issued by the auth provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub exp: usize,
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;
    use crate::error::AppError;

    fn token(user_id: Uuid, secret: &str, expires_in: Duration) -> String {
        let claims = JwtClaims {
            user_id,
            exp: (Utc::now() + expires_in).timestamp() as usize,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn token_validates_with_same_secret() {
        let user_id = Uuid::new_v4();
        let claims = validate_jwt(&token(user_id, "test-secret", Duration::hours(1)), "test-secret")
            .unwrap();
        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = token(Uuid::new_v4(), "test-secret", Duration::hours(1));
        assert!(matches!(
            validate_jwt(&token, "other-secret"),
            Err(AppError::JWT(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = token(Uuid::new_v4(), "test-secret", Duration::hours(-2));
        assert!(validate_jwt(&token, "test-secret").is_err());
    }
}
