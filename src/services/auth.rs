use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthSettings;
use crate::models::{User, UserId};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("Malformed subject: {0}")]
    BadSubject(String),
}

/// Bearer token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub staff: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::BadSubject(self.sub.clone()))
    }
}

/// HS256 token issuer and verifier
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.jwt_secret.as_bytes(), Duration::seconds(settings.token_ttl_secs))
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            staff: user.is_staff,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId, is_staff: bool) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            is_staff,
            email_verified: false,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new(b"secret", Duration::hours(1));
        let token = issuer.issue(&user(42, true)).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert!(claims.staff);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new(b"secret", Duration::hours(1))
            .issue(&user(1, false))
            .unwrap();

        assert!(TokenIssuer::new(b"other", Duration::hours(1)).verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Beyond the default 60s leeway
        let issuer = TokenIssuer::new(b"secret", Duration::minutes(-5));
        let token = issuer.issue(&user(1, false)).unwrap();

        assert!(issuer.verify(&token).is_err());
    }
}
