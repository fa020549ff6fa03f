mod common;

use serde_json::{json, Value};

fn ids(body: &Value) -> Vec<String> {
    let mut ids: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn list_all_resources() {
    let env = common::TestEnv::start();
    let server = env.server();

    let body: Value = server.get("/api/v1/data").await.json();
    assert_eq!(ids(&body), vec!["r1", "r2", "r3"]);

    let explicit: Value = server
        .get("/api/v1/data")
        .add_query_param("category", "all")
        .await
        .json();
    assert_eq!(ids(&explicit), ids(&body));
}

#[tokio::test]
async fn list_by_second_level_category() {
    let env = common::TestEnv::start();
    let server = env.server();

    let body: Value = server
        .get("/api/v1/data")
        .add_query_param("category", "a2")
        .await
        .json();
    assert_eq!(ids(&body), vec!["r2", "r3"]);
}

#[tokio::test]
async fn list_by_root_category_is_deduplicated() {
    let env = common::TestEnv::start();
    let server = env.server();

    let body: Value = server
        .get("/api/v1/data")
        .add_query_param("category", "A")
        .await
        .json();
    // r2 is linked from both a1 and a2 but appears once.
    assert_eq!(ids(&body), vec!["r1", "r2", "r3"]);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn list_unknown_category_returns_everything() {
    let env = common::TestEnv::start();
    let server = env.server();

    let body: Value = server
        .get("/api/v1/data")
        .add_query_param("category", "does-not-exist")
        .await
        .json();
    assert_eq!(ids(&body), vec!["r1", "r2", "r3"]);
}

#[tokio::test]
async fn resources_are_flattened() {
    let env = common::TestEnv::start();
    let server = env.server();

    let body: Value = server
        .get("/api/v1/data")
        .add_query_param("category", "b1")
        .await
        .json();
    let r3 = &body["data"][0];
    assert_eq!(r3["Name"], "Playwright");
    assert_eq!(r3["URL"], "https://playwright.dev");
    assert_eq!(r3["Tags"][0]["name"], "test");
}

#[tokio::test]
async fn submit_requires_session() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();

    let response = server
        .post("/api/v1/data")
        .json(&json!({ "name": "Astro", "url": "https://astro.build" }))
        .await;

    response.assert_status_unauthorized();
    assert!(env.notion.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submit_creates_row_and_invalidates_cache() {
    let env = common::TestEnv::start();
    let server = env.server();
    env.login(&server).await;

    // Warm the cache.
    let before: Value = server.get("/api/v1/data").await.json();
    assert_eq!(before["data"].as_array().unwrap().len(), 3);

    let response = server
        .post("/api/v1/data")
        .json(&json!({
            "name": "Astro",
            "url": "https://astro.build",
            "desc": "Content-driven websites",
            "tags": ["framework"],
            "categories": ["a1"],
            "icon": "https://astro.build/favicon.svg"
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["Name"], "Astro");
    assert_eq!(body["data"]["icon"]["value"], "https://astro.build/favicon.svg");

    let created = env.notion.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].parent.database_id, common::RESOURCES_DB);
    assert_eq!(created[0].properties["Category"]["relation"][0]["id"], "a1");

    let after: Value = server.get("/api/v1/data").await.json();
    assert_eq!(after["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn submit_validation_errors() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();
    env.login(&server).await.assert_status_ok();

    for payload in [
        json!({ "name": "", "url": "https://astro.build" }),
        json!({ "name": "Astro", "url": "not a url" }),
        json!({ "name": "Astro", "url": "ftp://astro.build" }),
        json!({ "name": "Astro", "url": "https://astro.build", "icon": "javascript:alert(1)" }),
    ] {
        let response = server.post("/api/v1/data").json(&payload).await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    assert!(env.notion.created.lock().unwrap().is_empty());
}
