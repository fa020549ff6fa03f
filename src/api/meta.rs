use axum::extract::State;
use serde::Deserialize;

use crate::api::envelope::ApiResponse;
use crate::api::extract::Json;
use crate::app::AppState;
use crate::error::AppError;
use crate::rendering::meta::{fetch_meta, PageMeta};

#[derive(Debug, Deserialize)]
pub struct MetaRequest {
    pub url: String,
}

/// `POST /api/v1/meta`: title, description and icon of a third-party page,
/// used to prefill the submission form.
pub async fn meta_handler(
    State(state): State<AppState>,
    Json(req): Json<MetaRequest>,
) -> Result<Json<ApiResponse<PageMeta>>, AppError> {
    let meta = fetch_meta(&state.http, req.url.trim()).await?;
    Ok(Json(ApiResponse::ok(meta)))
}
