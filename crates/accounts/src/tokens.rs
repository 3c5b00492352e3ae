//! HS256 login tokens for registered users.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sx_domain::config::UserAuthConfig;

use crate::error::{AccountError, Result};
use crate::users::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: u64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    /// Read the signing secret from `config.jwt_secret_env`, falling back to
    /// a random per-process secret.
    pub fn from_config(config: &UserAuthConfig) -> Self {
        let ttl = Duration::hours(config.token_ttl_hours as i64);
        match std::env::var(&config.jwt_secret_env) {
            Ok(secret) if !secret.is_empty() => Self::new(secret.as_bytes(), ttl),
            _ => {
                tracing::warn!(
                    env_var = %config.jwt_secret_env,
                    "JWT secret not set; using a random per-process secret \
                     (login tokens will not survive a restart)"
                );
                let mut secret = [0u8; 32];
                rand::rngs::OsRng.fill_bytes(&mut secret);
                Self::new(&secret, ttl)
            }
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AccountError::Storage(format!("token signing failed: {e}")))
    }

    /// Validate signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token.trim(), &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AccountError::AuthFailed("invalid or expired token".into())
            })
    }
}
