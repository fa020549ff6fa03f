use axum::extract::State;

use crate::api::envelope::ApiResponse;
use crate::api::extract::Json;
use crate::app::AppState;
use crate::catalog::models::CategoryViewNode;
use crate::error::AppError;

/// `GET /api/v1/category`: the two-level category tree with resolved links.
pub async fn category_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryViewNode>>>, AppError> {
    let snapshot = state.catalog()?.snapshot().await?;
    Ok(Json(ApiResponse::ok(snapshot.tree.clone())))
}
