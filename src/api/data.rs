use axum::extract::State;
use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::api::envelope::ApiResponse;
use crate::api::extract::{Json, Query};
use crate::app::AppState;
use crate::auth::models::AuthenticatedUser;
use crate::catalog::cache::Catalog;
use crate::catalog::filter::{filter_resources, ALL};
use crate::error::AppError;
use crate::notion::fields::ResourceFields;
use crate::notion::models::{CreatePageRequest, DatabaseParent, ResourceRecord};
use crate::notion::transform::transform_page;
use crate::rendering::meta::parse_http_url;

/// Notion caps a single rich text run at 2000 characters.
const MAX_TEXT_CHARS: usize = 2000;
const MAX_NAME_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    /// Selected category id; `all` or absent for everything.
    #[serde(default)]
    pub category: Option<String>,
}

/// `GET /api/v1/data`: resources for the selected category.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<DataQuery>,
) -> Result<Json<ApiResponse<Vec<ResourceRecord>>>, AppError> {
    let snapshot = state.catalog()?.snapshot().await?;
    let selected = query.category.as_deref().unwrap_or(ALL);

    Ok(Json(ApiResponse::ok(filter_resources(
        &snapshot.resources,
        &snapshot.tree,
        selected,
    ))))
}

/// A new resource submitted by a signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of the (secondary) categories the resource belongs to.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Icon image URL, e.g. from `/api/v1/meta` or `/api/v1/upload`.
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
}

/// Validate a submission and build the Notion property payload.
pub fn build_properties(
    req: &SubmitRequest,
    fields: &ResourceFields,
) -> Result<Map<String, Value>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name cannot be empty".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "Name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    let url = parse_http_url(&req.url)?;
    let desc = req.desc.trim();
    if desc.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Description must be at most {MAX_TEXT_CHARS} characters"
        )));
    }

    let mut properties = Map::new();
    properties.insert(
        fields.name.clone(),
        json!({ "title": [{ "text": { "content": name } }] }),
    );

    let url_field = fields
        .url
        .as_ref()
        .ok_or_else(|| AppError::Config("resource database has no url property".into()))?;
    properties.insert(url_field.clone(), json!({ "url": url.as_str() }));

    if !desc.is_empty() {
        if let Some(desc_field) = &fields.desc {
            properties.insert(
                desc_field.clone(),
                json!({ "rich_text": [{ "text": { "content": desc } }] }),
            );
        }
    }

    let mut tags: Vec<&str> = Vec::new();
    for tag in req.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if !tags.is_empty() {
        let tags_field = fields.tags.as_ref().ok_or_else(|| {
            AppError::BadRequest("This directory does not accept tags".into())
        })?;
        let options: Vec<Value> = tags.iter().map(|t| json!({ "name": t })).collect();
        properties.insert(tags_field.clone(), json!({ "multi_select": options }));
    }

    if !req.categories.is_empty() {
        let category_field = fields.category.as_ref().ok_or_else(|| {
            AppError::BadRequest("This directory does not accept categories".into())
        })?;
        let relation: Vec<Value> = req.categories.iter().map(|id| json!({ "id": id })).collect();
        properties.insert(category_field.clone(), json!({ "relation": relation }));
    }

    Ok(properties)
}

fn external_file(raw: &Option<String>) -> Result<Option<Value>, AppError> {
    raw.as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| {
            let url = parse_http_url(u)?;
            Ok(json!({ "type": "external", "external": { "url": url.as_str() } }))
        })
        .transpose()
}

/// Core submission logic, separated from the HTTP layer.
pub async fn process_submit(
    catalog: &Catalog,
    request: SubmitRequest,
    user: &AuthenticatedUser,
) -> Result<ResourceRecord, AppError> {
    let database_id = catalog.settings().resource_database()?.to_string();
    let fields = catalog.resource_fields().await?;
    let properties = build_properties(&request, fields)?;

    let create = CreatePageRequest {
        parent: DatabaseParent { database_id },
        properties,
        icon: external_file(&request.icon)?,
        cover: external_file(&request.cover)?,
    };

    let created = catalog.notion().create_page(&create).await?;
    catalog.invalidate();

    tracing::info!(id = %created.id, submitted_by = %user.login, "Resource submitted");

    Ok(transform_page(&created))
}

/// `POST /api/v1/data`: submit a new resource.
pub async fn submit_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<ApiResponse<ResourceRecord>>, AppError> {
    let created = process_submit(state.catalog()?, request, &user).await?;
    Ok(Json(ApiResponse::ok(created)))
}
