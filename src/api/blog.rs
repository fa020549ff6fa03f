use axum::extract::{Path, State};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::envelope::ApiResponse;
use crate::api::extract::Json;
use crate::app::AppState;
use crate::config::{BlogFieldNames, NotionSettings};
use crate::error::AppError;
use crate::notion::client::{list_all_blocks, query_all, NotionClient, NotionError};
use crate::notion::models::{Icon, NotionPage, QueryRequest};
use crate::notion::transform::transform_page;
use crate::rendering::blocks::blocks_to_markdown;
use crate::rendering::markdown::render_markdown;

/// A blog post as listed; the body is fetched separately.
#[derive(Debug, Clone, Serialize)]
pub struct BlogPostSummary {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub date: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

impl BlogPostSummary {
    pub fn from_page(page: &NotionPage, fields: &BlogFieldNames) -> Self {
        Self {
            id: page.id.clone(),
            title: page.text(&fields.title).to_string(),
            summary: page.text(&fields.summary).to_string(),
            tags: page.tags(&fields.tags),
            date: page.text(&fields.date).to_string(),
            slug: page.text(&fields.slug).to_string(),
            icon: page.icon.clone(),
            cover: page.cover.clone(),
        }
    }

    fn matches(&self, id_or_slug: &str) -> bool {
        self.id == id_or_slug
            || self.id.replace('-', "") == id_or_slug.replace('-', "")
            || (!self.slug.is_empty() && self.slug == id_or_slug)
    }
}

/// A rendered blog post.
#[derive(Debug, Clone, Serialize)]
pub struct BlogPost {
    #[serde(flatten)]
    pub summary: BlogPostSummary,
    /// Sanitized HTML body.
    pub html: String,
}

/// Published posts, newest first.
pub async fn list_published(
    notion: &dyn NotionClient,
    settings: &NotionSettings,
) -> Result<Vec<BlogPostSummary>, AppError> {
    let fields = &settings.blog_fields;
    let request = QueryRequest {
        filter: Some(json!({
            "property": fields.published,
            "checkbox": { "equals": true }
        })),
        sorts: vec![json!({ "property": fields.date, "direction": "descending" })],
        ..Default::default()
    };

    let rows = query_all(notion, settings.blog_database()?, request).await?;
    Ok(rows
        .iter()
        .map(|raw| BlogPostSummary::from_page(&transform_page(raw), fields))
        .collect())
}

/// Fetch a page's blocks, retrying once when the failure is transient.
pub async fn fetch_blocks(notion: &dyn NotionClient, page_id: &str) -> Result<Vec<Value>, NotionError> {
    match list_all_blocks(notion, page_id).await {
        Err(e) if e.is_transient() => {
            tracing::warn!(page_id, "Block fetch failed, retrying once: {e}");
            list_all_blocks(notion, page_id).await
        }
        other => other,
    }
}

/// Look up a published post by id or slug and render its body.
pub async fn render_post(
    notion: &dyn NotionClient,
    settings: &NotionSettings,
    id_or_slug: &str,
) -> Result<BlogPost, AppError> {
    let summary = list_published(notion, settings)
        .await?
        .into_iter()
        .find(|post| post.matches(id_or_slug))
        .ok_or_else(|| AppError::NotFound(format!("Blog post '{id_or_slug}' not found")))?;

    let blocks = fetch_blocks(notion, &summary.id).await.map_err(|e| match e {
        NotionError::Api { status: 404, .. } => {
            AppError::NotFound(format!("Blog post '{id_or_slug}' not found"))
        }
        other => other.into(),
    })?;

    let html = render_markdown(&blocks_to_markdown(&blocks));
    Ok(BlogPost { summary, html })
}

/// `GET /api/v1/blog`
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BlogPostSummary>>>, AppError> {
    let posts = list_published(state.notion()?, &state.settings.notion).await?;
    Ok(Json(ApiResponse::ok(posts)))
}

/// `GET /api/v1/blog/{id}`: `id` may also be the post's slug.
pub async fn post_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BlogPost>>, AppError> {
    let post = render_post(state.notion()?, &state.settings.notion, &id).await?;
    Ok(Json(ApiResponse::ok(post)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notion::models::{BlockList, CreatePageRequest, DatabaseSchema, QueryResponse, RawPage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` block fetches with the given error.
    struct FlakyBlocks {
        failures: usize,
        error: fn() -> NotionError,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NotionClient for FlakyBlocks {
        async fn query_database(
            &self,
            _database_id: &str,
            _request: &QueryRequest,
        ) -> Result<QueryResponse, NotionError> {
            Ok(QueryResponse::default())
        }

        async fn retrieve_database(&self, _id: &str) -> Result<DatabaseSchema, NotionError> {
            Ok(DatabaseSchema::default())
        }

        async fn create_page(&self, _request: &CreatePageRequest) -> Result<RawPage, NotionError> {
            Ok(RawPage::default())
        }

        async fn list_block_children(
            &self,
            _block_id: &str,
            _start_cursor: Option<&str>,
        ) -> Result<BlockList, NotionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err((self.error)());
            }
            Ok(BlockList {
                results: vec![json!({
                    "type": "paragraph",
                    "paragraph": { "rich_text": [{ "plain_text": "hi", "annotations": {} }] }
                })],
                ..Default::default()
            })
        }
    }

    fn flaky(failures: usize, error: fn() -> NotionError) -> FlakyBlocks {
        FlakyBlocks {
            failures,
            error,
            calls: AtomicUsize::new(0),
        }
    }

    fn network() -> NotionError {
        NotionError::Network("timeout".into())
    }

    fn not_found() -> NotionError {
        NotionError::Api {
            status: 404,
            code: "object_not_found".into(),
            message: "gone".into(),
        }
    }

    #[tokio::test]
    async fn test_retries_once_on_network_error() {
        let client = flaky(1, network);
        let blocks = fetch_blocks(&client, "p1").await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_second_failure() {
        let client = flaky(2, network);
        assert!(fetch_blocks(&client, "p1").await.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_on_api_error() {
        let client = flaky(1, not_found);
        assert!(fetch_blocks(&client, "p1").await.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_summary_matches_id_or_slug() {
        let post = BlogPostSummary {
            id: "1234-abcd".into(),
            title: "T".into(),
            summary: String::new(),
            tags: vec![],
            date: String::new(),
            slug: "hello-world".into(),
            icon: None,
            cover: None,
        };
        assert!(post.matches("1234-abcd"));
        assert!(post.matches("1234abcd"));
        assert!(post.matches("hello-world"));
        assert!(!post.matches("other"));
    }
}
