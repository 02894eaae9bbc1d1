use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
};

/// ID tokens and the session cookie share this lifetime.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// HS256 keys for issuing and verifying ID tokens.
#[derive(Clone)]
pub struct TokenKeys {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str, role: &str) -> AppResult<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(Duration::days(TOKEN_TTL_DAYS))
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.inner.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.inner.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let keys = TokenKeys::from_secret("test-secret");
        let id = Uuid::new_v4();
        let token = keys.issue(id, "ana@tagwear.pe", "user").expect("token");
        let claims = keys.verify(&token).expect("claims");
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.role, "user");
        assert_eq!(claims.email, "ana@tagwear.pe");
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = TokenKeys::from_secret("one")
            .issue(Uuid::new_v4(), "a@b.c", "admin")
            .expect("token");
        let err = TokenKeys::from_secret("two").verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = TokenKeys::from_secret("test-secret");
        let past = (Utc::now() - Duration::days(1)).timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "old@tagwear.pe".into(),
            role: "user".into(),
            iat: past - 3600,
            exp: past,
        };
        let token = keys.sign(&claims).expect("token");
        assert!(keys.verify(&token).is_err());
    }
}
