pub mod denylist;
pub mod lockout;
pub mod otp;
pub mod password;
pub mod role;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{SecurityConfig, MAX_JWT_EXPIRY_HOURS};

pub use denylist::TokenDenylist;
pub use role::Role;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Token has been revoked")]
    Revoked,

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Trainer `ID`
    pub sub: i64,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    /// Token id, the key used by the denylist
    pub jti: String,
}

impl Claims {
    pub fn new(user_id: i64, email: impl Into<String>, role: Role, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = expires_at(now, expiry_hours);

        Self {
            sub: user_id,
            email: email.into(),
            role: role.as_str().to_string(),
            exp,
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Same subject with fresh timestamps and token id
    pub fn renewed(&self, expiry_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            exp: expires_at(now, expiry_hours),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}

fn expires_at(now: DateTime<Utc>, expiry_hours: u64) -> i64 {
    let hours = expiry_hours.min(MAX_JWT_EXPIRY_HOURS) as i64;
    (now + Duration::hours(hours)).timestamp()
}

/// HS256 signing material built once from configuration
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub expiry_hours: u64,
}

impl JwtKeys {
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        Self::new(&security.jwt_secret, security.jwt_expiry_hours)
    }

    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours: expiry_hours.min(MAX_JWT_EXPIRY_HOURS),
        })
    }

    pub fn issue(&self, user_id: i64, email: &str, role: Role) -> Result<String, AuthError> {
        self.sign(&Claims::new(user_id, email, role, self.expiry_hours))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding).map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").field("expiry_hours", &self.expiry_hours).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absurd_expiry_is_capped() {
        let claims = Claims::new(1, "a@example.com", Role::Trainer, u64::MAX);
        assert_eq!(claims.exp - claims.iat, MAX_JWT_EXPIRY_HOURS as i64 * 3600);

        let renewed = claims.renewed(u64::MAX);
        assert_eq!(renewed.exp - renewed.iat, MAX_JWT_EXPIRY_HOURS as i64 * 3600);

        let keys = JwtKeys::new("test-secret", u64::MAX).unwrap();
        assert_eq!(keys.expiry_hours, MAX_JWT_EXPIRY_HOURS);
    }

    #[test]
    fn issued_tokens_verify() {
        let keys = JwtKeys::new("test-secret", 1).unwrap();
        let token = keys.issue(7, "ann@example.com", Role::Manager).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "ann@example.com");
        assert_eq!(claims.role, "manager");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn foreign_tokens_are_rejected() {
        let keys = JwtKeys::new("test-secret", 1).unwrap();
        let other = JwtKeys::new("other-secret", 1).unwrap();
        let token = other.issue(7, "ann@example.com", Role::Trainer).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken(_))));
        assert!(matches!(keys.verify("not.a.token"), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = JwtKeys::new("test-secret", 1).unwrap();
        let mut claims = Claims::new(7, "ann@example.com", Role::Trainer, 1);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = keys.sign(&claims).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn renewal_changes_token_id() {
        let claims = Claims::new(7, "ann@example.com", Role::Admin, 1);
        let renewed = claims.renewed(2);
        assert_eq!(renewed.sub, claims.sub);
        assert_ne!(renewed.jti, claims.jti);
        assert!(renewed.exp >= claims.exp);
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        assert!(matches!(JwtKeys::new("", 1), Err(AuthError::InvalidSecret)));
    }
}
