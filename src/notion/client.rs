use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::NotionSettings;
use crate::error::AppError;
use crate::notion::models::{
    BlockList, CreatePageRequest, DatabaseSchema, QueryRequest, QueryResponse, RawPage,
};

/// Upper bound on pages followed by [`query_all`] / [`list_all_blocks`].
const MAX_PAGES: usize = 100;

#[derive(Debug, Error)]
pub enum NotionError {
    /// Timeout or connection failure; the request may succeed if repeated.
    #[error("Notion unreachable: {0}")]
    Network(String),

    #[error("Notion API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to decode Notion response: {0}")]
    Decode(String),
}

impl NotionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, NotionError::Network(_))
    }
}

impl From<reqwest::Error> for NotionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            NotionError::Network(e.to_string())
        } else if e.is_decode() {
            NotionError::Decode(e.to_string())
        } else {
            NotionError::Api {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                code: "request_failed".to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Trait for Notion API operations.
///
/// Abstracted as a trait so tests can use an in-memory workspace.
#[async_trait]
pub trait NotionClient: Send + Sync {
    /// Query one page of rows from a database.
    async fn query_database(
        &self,
        database_id: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, NotionError>;

    /// Retrieve a database's property schema.
    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseSchema, NotionError>;

    /// Create a new row.
    async fn create_page(&self, request: &CreatePageRequest) -> Result<RawPage, NotionError>;

    /// List one page of a block's children.
    async fn list_block_children(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<BlockList, NotionError>;
}

/// Drive a database query to exhaustion, following `next_cursor`.
pub async fn query_all(
    client: &dyn NotionClient,
    database_id: &str,
    mut request: QueryRequest,
) -> Result<Vec<RawPage>, NotionError> {
    let mut rows = Vec::new();

    for _ in 0..MAX_PAGES {
        let page = client.query_database(database_id, &request).await?;
        rows.extend(page.results);

        match (page.has_more, page.next_cursor) {
            (true, Some(cursor)) => request.start_cursor = Some(cursor),
            _ => return Ok(rows),
        }
    }

    tracing::warn!(database_id, "Stopped paginating after {MAX_PAGES} pages");
    Ok(rows)
}

/// Fetch every top-level block of a page.
pub async fn list_all_blocks(
    client: &dyn NotionClient,
    block_id: &str,
) -> Result<Vec<Value>, NotionError> {
    let mut blocks = Vec::new();
    let mut cursor: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let page = client
            .list_block_children(block_id, cursor.as_deref())
            .await?;
        blocks.extend(page.results);

        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            _ => break,
        }
    }

    Ok(blocks)
}

/// reqwest implementation of NotionClient.
pub struct HttpNotionClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    version: String,
}

impl HttpNotionClient {
    /// Build a client from settings. Fails when no token is configured.
    pub fn from_settings(settings: &NotionSettings) -> Result<Self, AppError> {
        let token = settings
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Config("notion.token is not configured".into()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token,
            version: settings.version.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, NotionError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(NotionError::Api {
                status: status.as_u16(),
                code: body["code"].as_str().unwrap_or("unknown").to_string(),
                message: body["message"].as_str().unwrap_or("").to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| NotionError::Decode(e.to_string()))
    }
}

#[async_trait]
impl NotionClient for HttpNotionClient {
    async fn query_database(
        &self,
        database_id: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, NotionError> {
        let builder = self
            .request(
                reqwest::Method::POST,
                &format!("/databases/{database_id}/query"),
            )
            .json(request);
        self.send(builder).await
    }

    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseSchema, NotionError> {
        let builder = self.request(reqwest::Method::GET, &format!("/databases/{database_id}"));
        self.send(builder).await
    }

    async fn create_page(&self, request: &CreatePageRequest) -> Result<RawPage, NotionError> {
        let builder = self.request(reqwest::Method::POST, "/pages").json(request);
        self.send(builder).await
    }

    async fn list_block_children(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<BlockList, NotionError> {
        let mut builder = self
            .request(reqwest::Method::GET, &format!("/blocks/{block_id}/children"))
            .query(&[("page_size", "100")]);
        if let Some(cursor) = start_cursor {
            builder = builder.query(&[("start_cursor", cursor)]);
        }
        self.send(builder).await
    }
}
