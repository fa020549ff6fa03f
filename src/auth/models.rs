use serde::{Deserialize, Serialize};

/// A user holding a valid session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Stable identifier carried as the token subject.
    pub user_id: String,
    /// Display login (e.g. a GitHub handle).
    pub login: String,
}

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub login: String,
    /// Unique token id.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<SessionClaims> for AuthenticatedUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            login: claims.login,
        }
    }
}
