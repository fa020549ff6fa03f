use axum::extract::State;
use axum::Extension;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::api::envelope::ApiResponse;
use crate::api::extract::Json;
use crate::app::AppState;
use crate::auth::models::AuthenticatedUser;
use crate::auth::session::{SessionKeys, SESSION_COOKIE};
use crate::config::AuthSettings;
use crate::error::AppError;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub service_token: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: AuthenticatedUser,
    /// The session token, for clients that prefer a bearer header over the cookie.
    pub token: String,
}

/// Validate a login request against the configured service token.
pub fn authenticate(settings: &AuthSettings, req: &LoginRequest) -> Result<AuthenticatedUser, AppError> {
    let expected = settings
        .service_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Config("auth.service_token is not configured".into()))?;

    let login = req.login.trim();
    if login.is_empty() {
        return Err(AppError::BadRequest("Login cannot be empty".into()));
    }
    if !tokens_match(&req.service_token, expected) {
        return Err(AppError::Auth("Invalid service token".into()));
    }

    Ok(AuthenticatedUser {
        user_id: format!("svc-{}", login.to_lowercase()),
        login: login.to_string(),
    })
}

/// Compares digests so the comparison time does not depend on where the
/// tokens first differ.
fn tokens_match(given: &str, expected: &str) -> bool {
    let given = Sha256::digest(given.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    given
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// `POST /api/auth/login`: exchanges the service token for a session.
///
/// On success, sets the `fenav_session` cookie and returns the user info.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), AppError> {
    let user = authenticate(&state.settings.auth, &req)?;
    let keys = SessionKeys::from_settings(&state.settings.auth)?;
    let token = keys.issue(&user)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(keys.ttl().num_seconds()))
        .build();

    tracing::info!(login = %user.login, "Session issued");

    Ok((
        jar.add(cookie),
        Json(ApiResponse::ok(LoginResponse { user, token })),
    ))
}

/// `GET /api/auth/me`: the current session user.
pub async fn me_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<ApiResponse<AuthenticatedUser>> {
    Json(ApiResponse::ok(user))
}

/// `POST /api/auth/logout`: clears the session cookie.
pub async fn logout_handler(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    let cookie = Cookie::build((SESSION_COOKIE, "")).path("/").removal().build();
    (jar.remove(cookie), Json(ApiResponse::ok(())))
}
