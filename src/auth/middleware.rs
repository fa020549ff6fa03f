use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;

use crate::app::AppState;
use crate::auth::session::{SessionKeys, SESSION_COOKIE};
use crate::error::AppError;

/// Route layer for protected routes.
///
/// Accepts a session from `Authorization: Bearer` or the session cookie,
/// verifies it and stores the [`AuthenticatedUser`] in request extensions.
///
/// [`AuthenticatedUser`]: crate::auth::models::AuthenticatedUser
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| AppError::Auth("Not logged in".into()))?;

    let keys = SessionKeys::from_settings(&state.settings.auth)?;
    let user = keys.verify(&token)?;

    tracing::debug!(user = %user.login, path = %request.uri().path(), "Authenticated request");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
