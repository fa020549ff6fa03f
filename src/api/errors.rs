use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::envelope::ApiResponse;
use crate::error::AppError;

/// API-specific error wrapper that converts AppError into HTTP responses.
///
/// Upstream and internal failures are logged in full and answered with a
/// generic message; their details never reach the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Upstream(msg) | AppError::Storage(msg) => {
                tracing::error!("Upstream failure: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Upstream service error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ApiResponse::failure(message, self.code());

        (status, axum::Json(body)).into_response()
    }
}
