use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::models::{AuthenticatedUser, SessionClaims};
use crate::config::AuthSettings;
use crate::error::AppError;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "fenav_session";

/// Signs and verifies session tokens.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Keys from settings; a missing secret is a configuration error.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AppError> {
        Ok(Self::new(
            settings.secret()?,
            Duration::hours(settings.session_ttl_hours),
        ))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed token for `user`.
    pub fn issue(&self, user: &AuthenticatedUser) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.user_id.clone(),
            login: user.login.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign session: {e}")))
    }

    /// Verify a token's signature and expiry.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims.into())
            .map_err(|e| AppError::Auth(format!("Invalid session: {e}")))
    }
}
