use axum::extract::State;
use serde::Deserialize;

use crate::api::envelope::ApiResponse;
use crate::api::extract::Json;
use crate::app::AppState;
use crate::catalog::cache::Catalog;
use crate::error::AppError;
use crate::notion::fields::ResourceFields;
use crate::notion::models::DatabaseSchema;
use crate::search::aggregator::{Collection, SearchAggregator, SearchResult};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

/// Resolved resource fields, or the configured overrides alone when the
/// schema cannot be read right now. Search degrades instead of failing.
async fn search_fields(catalog: &Catalog) -> ResourceFields {
    match catalog.resource_fields().await {
        Ok(fields) => fields.clone(),
        Err(e) => {
            tracing::warn!("Resource schema unavailable, searching with configured fields: {e}");
            ResourceFields::resolve(&DatabaseSchema::default(), &catalog.settings().resource_fields)
        }
    }
}

/// `POST /api/v1/search`: resources and published blog posts whose title
/// or description contains the query.
pub async fn search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<ApiResponse<Vec<SearchResult>>>, AppError> {
    if req.query.trim().is_empty() {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    }

    let catalog = state.catalog()?;
    let settings = catalog.settings();
    let fields = search_fields(catalog).await;

    let resources = Collection::resources(settings.resource_database()?, &fields);
    let blog = Collection::blog(settings.blog_database()?, &settings.blog_fields);

    let hits = SearchAggregator::new(catalog.notion(), resources, blog)
        .search(&req.query)
        .await;

    Ok(Json(ApiResponse::ok(hits)))
}
