#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Map, Value};

use fenav::app::{build_router, AppState};
use fenav::config::Settings;
use fenav::error::AppError;
use fenav::notion::client::{NotionClient, NotionError};
use fenav::notion::models::{
    BlockList, CreatePageRequest, DatabaseSchema, QueryRequest, QueryResponse, RawPage,
    SchemaProperty,
};
use fenav::storage::client::StorageClient;

pub const RESOURCES_DB: &str = "db-resources";
pub const CATEGORIES_DB: &str = "db-categories";
pub const BLOG_DB: &str = "db-blog";
pub const SERVICE_TOKEN: &str = "test-token";

// -- Raw Notion property builders --

pub fn title(text: &str) -> Value {
    json!({ "type": "title", "title": [{ "plain_text": text }] })
}

pub fn rich_text(text: &str) -> Value {
    json!({ "type": "rich_text", "rich_text": [{ "plain_text": text }] })
}

pub fn url(value: &str) -> Value {
    json!({ "type": "url", "url": value })
}

pub fn number(n: i64) -> Value {
    json!({ "type": "number", "number": n })
}

pub fn checkbox(b: bool) -> Value {
    json!({ "type": "checkbox", "checkbox": b })
}

pub fn date(start: &str) -> Value {
    json!({ "type": "date", "date": { "start": start } })
}

pub fn multi_select(names: &[&str]) -> Value {
    let options: Vec<Value> = names
        .iter()
        .map(|n| json!({ "id": format!("opt-{n}"), "name": n }))
        .collect();
    json!({ "type": "multi_select", "multi_select": options })
}

pub fn relation(ids: &[&str]) -> Value {
    let refs: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({ "type": "relation", "relation": refs })
}

pub fn raw_page(id: &str, properties: Vec<(&str, Value)>) -> RawPage {
    RawPage {
        id: id.to_string(),
        properties: properties
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        ..Default::default()
    }
}

/// Text of a raw title / rich_text wrapper, for evaluating filters.
fn raw_text(wrapper: &Value) -> String {
    let kind = wrapper["type"].as_str().unwrap_or("");
    wrapper[kind]
        .as_array()
        .map(|runs| {
            runs.iter()
                .filter_map(|r| r["plain_text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Minimal evaluator for the filter shapes the server sends.
fn matches_filter(page: &RawPage, filter: &Value) -> bool {
    if let Some(any) = filter["or"].as_array() {
        return any.iter().any(|f| matches_filter(page, f));
    }
    if let Some(all) = filter["and"].as_array() {
        return all.iter().all(|f| matches_filter(page, f));
    }
    let property = filter["property"].as_str().unwrap_or("");
    let Some(wrapper) = page.properties.get(property) else {
        return false;
    };
    for kind in ["title", "rich_text"] {
        if let Some(needle) = filter[kind]["contains"].as_str() {
            return raw_text(wrapper)
                .to_lowercase()
                .contains(&needle.to_lowercase());
        }
    }
    if let Some(expected) = filter["checkbox"]["equals"].as_bool() {
        return wrapper["checkbox"].as_bool() == Some(expected);
    }
    false
}

/// Convert a create-page property payload into the shape Notion returns.
fn stored_property(name: &str, schema: &DatabaseSchema, payload: &Value) -> Value {
    let kind = schema
        .properties
        .get(name)
        .map(|p| p.kind.clone())
        .unwrap_or_default();
    let value = match kind.as_str() {
        "title" | "rich_text" => {
            let runs: Vec<Value> = payload[&kind]
                .as_array()
                .cloned()
                .unwrap_or_default()
                .iter()
                .map(|r| json!({ "plain_text": r["text"]["content"] }))
                .collect();
            Value::Array(runs)
        }
        _ => payload[&kind].clone(),
    };
    let mut wrapper = Map::new();
    wrapper.insert("type".to_string(), json!(kind));
    wrapper.insert(kind, value);
    Value::Object(wrapper)
}

/// In-memory Notion workspace.
#[derive(Default)]
pub struct MockNotion {
    pub databases: Mutex<HashMap<String, Vec<RawPage>>>,
    pub schemas: Mutex<HashMap<String, DatabaseSchema>>,
    pub blocks: Mutex<HashMap<String, Vec<Value>>>,
    /// Databases whose queries fail with a network error.
    pub failing: Mutex<HashSet<String>>,
    pub created: Mutex<Vec<CreatePageRequest>>,
    pub query_calls: AtomicUsize,
}

impl MockNotion {
    pub fn insert(&self, database_id: &str, page: RawPage) {
        self.databases
            .lock()
            .unwrap()
            .entry(database_id.to_string())
            .or_default()
            .push(page);
    }

    pub fn set_schema(&self, database_id: &str, properties: &[(&str, &str)]) {
        let schema = DatabaseSchema {
            id: database_id.to_string(),
            properties: properties
                .iter()
                .map(|(name, kind)| {
                    (
                        name.to_string(),
                        SchemaProperty {
                            kind: kind.to_string(),
                        },
                    )
                })
                .collect(),
        };
        self.schemas
            .lock()
            .unwrap()
            .insert(database_id.to_string(), schema);
    }

    pub fn fail(&self, database_id: &str) {
        self.failing.lock().unwrap().insert(database_id.to_string());
    }

    pub fn query_count(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotionClient for MockNotion {
    async fn query_database(
        &self,
        database_id: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, NotionError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(database_id) {
            return Err(NotionError::Network("connection refused".into()));
        }
        let rows = self
            .databases
            .lock()
            .unwrap()
            .get(database_id)
            .cloned()
            .ok_or_else(|| NotionError::Api {
                status: 404,
                code: "object_not_found".into(),
                message: format!("Could not find database {database_id}"),
            })?;
        let results = rows
            .into_iter()
            .filter(|page| {
                request
                    .filter
                    .as_ref()
                    .map(|f| matches_filter(page, f))
                    .unwrap_or(true)
            })
            .collect();
        Ok(QueryResponse {
            results,
            has_more: false,
            next_cursor: None,
        })
    }

    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseSchema, NotionError> {
        self.schemas
            .lock()
            .unwrap()
            .get(database_id)
            .cloned()
            .ok_or_else(|| NotionError::Api {
                status: 404,
                code: "object_not_found".into(),
                message: "no schema".into(),
            })
    }

    async fn create_page(&self, request: &CreatePageRequest) -> Result<RawPage, NotionError> {
        let database_id = request.parent.database_id.clone();
        let schema = self
            .schemas
            .lock()
            .unwrap()
            .get(&database_id)
            .cloned()
            .unwrap_or_default();

        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        let page = RawPage {
            id: format!("new-{}", created.len()),
            icon: request.icon.clone(),
            cover: request.cover.clone(),
            properties: request
                .properties
                .iter()
                .map(|(name, payload)| (name.clone(), stored_property(name, &schema, payload)))
                .collect(),
            ..Default::default()
        };
        drop(created);

        self.insert(&database_id, page.clone());
        Ok(page)
    }

    async fn list_block_children(
        &self,
        block_id: &str,
        _start_cursor: Option<&str>,
    ) -> Result<BlockList, NotionError> {
        let results = self
            .blocks
            .lock()
            .unwrap()
            .get(block_id)
            .cloned()
            .ok_or_else(|| NotionError::Api {
                status: 404,
                code: "object_not_found".into(),
                message: "no such block".into(),
            })?;
        Ok(BlockList {
            results,
            ..Default::default()
        })
    }
}

/// Storage that keeps uploaded objects in memory.
#[derive(Default)]
pub struct MockStorage {
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

#[async_trait]
impl StorageClient for MockStorage {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (content, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{key}")
    }
}

/// Settings pointing at the mock databases, with auth configured.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.notion.token = Some("secret_test".to_string());
    settings.notion.resource_database_id = Some(RESOURCES_DB.to_string());
    settings.notion.category_database_id = Some(CATEGORIES_DB.to_string());
    settings.notion.blog_database_id = Some(BLOG_DB.to_string());
    settings.auth.session_secret = Some("test-secret".to_string());
    settings.auth.service_token = Some(SERVICE_TOKEN.to_string());
    settings.cache.revalidate_secs = 300;
    settings
}

/// A workspace with the classic example: two primary categories
/// (A, B), their second-level children and three resources.
///
/// ```text
/// A (sort 2) ── a1 → [r1, r2]
///            └─ a2 → [r2, r3]
/// B (sort 1) ── b1 → [r3]
/// ```
pub fn seeded_notion() -> MockNotion {
    let notion = MockNotion::default();

    notion.set_schema(
        RESOURCES_DB,
        &[
            ("Name", "title"),
            ("Desc", "rich_text"),
            ("URL", "url"),
            ("Tags", "multi_select"),
            ("Category", "relation"),
        ],
    );

    for (id, name, desc, link, tags) in [
        ("r1", "Vite", "Next generation frontend tooling", "https://vitejs.dev", vec!["build"]),
        ("r2", "Tailwind CSS", "Utility-first CSS framework", "https://tailwindcss.com", vec!["css"]),
        ("r3", "Playwright", "Reliable end-to-end testing", "https://playwright.dev", vec!["test"]),
    ] {
        notion.insert(
            RESOURCES_DB,
            raw_page(
                id,
                vec![
                    ("Name", title(name)),
                    ("Desc", rich_text(desc)),
                    ("URL", url(link)),
                    ("Tags", multi_select(&tags)),
                ],
            ),
        );
    }

    let category = |id: &str, name: &str, sort: i64, parent: &[&str], children: &[&str], links: &[&str]| {
        raw_page(
            id,
            vec![
                ("Name", title(name)),
                ("Desc", rich_text("")),
                ("Sort", number(sort)),
                ("Parent", relation(parent)),
                ("Children", relation(children)),
                ("Links", relation(links)),
            ],
        )
    };
    for page in [
        category("A", "Tooling", 2, &[], &["a1", "a2"], &[]),
        category("a1", "Bundlers", 0, &["A"], &[], &["r1", "r2"]),
        category("a2", "Styling", 1, &["A"], &[], &["r2", "r3"]),
        category("B", "Quality", 1, &[], &["b1"], &[]),
        category("b1", "Testing", 0, &["B"], &[], &["r3"]),
    ] {
        notion.insert(CATEGORIES_DB, page);
    }

    // Newest first, as the date-descending sort would return them.
    for (id, name, summary, slug, published, day) in [
        ("p2", "Vite deep dive", "How the dev server works", "vite-deep-dive", true, "2024-03-01"),
        ("p1", "Hello world", "First post", "hello-world", true, "2024-01-01"),
        ("p0", "Vite draft", "Unpublished", "draft", false, "2024-04-01"),
    ] {
        notion.insert(
            BLOG_DB,
            raw_page(
                id,
                vec![
                    ("Title", title(name)),
                    ("Summary", rich_text(summary)),
                    ("Tags", multi_select(&["news"])),
                    ("Date", date(day)),
                    ("Slug", rich_text(slug)),
                    ("Published", checkbox(published)),
                ],
            ),
        );
    }
    notion.blocks.lock().unwrap().insert(
        "p1".to_string(),
        vec![
            json!({
                "type": "heading_1",
                "heading_1": { "rich_text": [{ "plain_text": "Welcome", "annotations": {} }] }
            }),
            json!({
                "type": "paragraph",
                "paragraph": { "rich_text": [{ "plain_text": "Hello <script>x</script>", "annotations": {} }] }
            }),
        ],
    );

    notion
}

/// Mock collaborators plus the router wired to them.
pub struct TestEnv {
    pub router: Router,
    pub notion: Arc<MockNotion>,
    pub storage: Arc<MockStorage>,
}

impl TestEnv {
    pub fn start() -> Self {
        Self::with(test_settings(), seeded_notion())
    }

    pub fn with(settings: Settings, notion: MockNotion) -> Self {
        let notion = Arc::new(notion);
        let storage = Arc::new(MockStorage::default());
        let state = AppState::new(
            settings,
            Some(notion.clone() as Arc<dyn NotionClient>),
            Some(storage.clone() as Arc<dyn StorageClient>),
        );
        Self {
            router: build_router(state),
            notion,
            storage,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .expect_success_by_default()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Helper: sign in with the service token; the cookie is kept by the server.
    pub async fn login(&self, server: &axum_test::TestServer) -> axum_test::TestResponse {
        server
            .post("/api/auth/login")
            .json(&json!({ "login": "tester", "service_token": SERVICE_TOKEN }))
            .await
    }
}
