use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Duration;
use uuid::Uuid;

use crate::infra::clock::Clock;
use crate::security::config::AuthConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Signature checked out but the expiry has passed.
    #[error("token expired")]
    Expired,
    /// Bad signature, malformed structure, or an unusable subject claim.
    #[error("token invalid")]
    Invalid,
    #[error("token signing failed: {0}")]
    Signing(String),
}

struct Keys {
    enc: EncodingKey,
    dec: DecodingKey,
}

impl Keys {
    fn from_secret(secret: &str) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret.as_bytes()),
            dec: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and verifies the two token families. Access and refresh tokens
/// are signed with distinct secrets, so neither verifies as the other; the
/// `jti` claim makes every minted value unique.
pub struct TokenCodec {
    access: Keys,
    refresh: Keys,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            access: Keys::from_secret(&config.access_secret),
            refresh: Keys::from_secret(&config.refresh_secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            clock,
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(&self.access, user_id, self.access_ttl)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(&self.refresh, user_id, self.refresh_ttl)
    }

    pub fn verify_access(&self, token: &str) -> Result<Uuid, TokenError> {
        self.verify(&self.access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Uuid, TokenError> {
        self.verify(&self.refresh, token)
    }

    fn issue(&self, keys: &Keys, user_id: Uuid, ttl: Duration) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &keys.enc)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, keys: &Keys, token: &str) -> Result<Uuid, TokenError> {
        // the library would check exp against the wall clock; expiry is
        // checked against the injected clock instead, with zero leeway
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let data =
            decode::<Claims>(token, &keys.dec, &validation).map_err(|_| TokenError::Invalid)?;
        if self.clock.now().unix_timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::Invalid)
    }
}
