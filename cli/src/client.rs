use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope used by every server endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    code: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self) -> Result<T> {
        if !self.success {
            bail!(
                "{} ({})",
                self.error.unwrap_or_else(|| "request failed".into()),
                self.code.unwrap_or_else(|| "UNKNOWN".into())
            );
        }
        self.data.ok_or_else(|| anyhow!("response has no data"))
    }
}

/// A node of the category tree as served by `/api/v1/category`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<CategoryNode>,
    #[serde(default)]
    pub links: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Submission {
    pub name: String,
    pub url: String,
    pub desc: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Thin client over the fenav HTTP API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fenav-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.context("Request to fenav failed")?;
        let status = response.status();
        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Unexpected response (HTTP {status})"))?;
        envelope.into_result()
    }

    pub async fn category_tree(&self) -> Result<Vec<CategoryNode>> {
        self.send(self.http.get(format!("{}/api/v1/category", self.base)))
            .await
    }

    pub async fn resources(&self, category: &str) -> Result<Vec<Value>> {
        self.send(
            self.http
                .get(format!("{}/api/v1/data", self.base))
                .query(&[("category", category)]),
        )
        .await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.send(
            self.http
                .post(format!("{}/api/v1/search", self.base))
                .json(&serde_json::json!({ "query": query })),
        )
        .await
    }

    /// Exchange the service token for a session token.
    pub async fn login(&self, login: &str, service_token: &str) -> Result<String> {
        let data: Value = self
            .send(
                self.http
                    .post(format!("{}/api/auth/login", self.base))
                    .json(&serde_json::json!({ "login": login, "service_token": service_token })),
            )
            .await?;
        data["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("login response has no token"))
    }

    pub async fn submit(&self, submission: &Submission) -> Result<Value> {
        self.send(
            self.http
                .post(format!("{}/api/v1/data", self.base))
                .json(submission),
        )
        .await
    }
}
