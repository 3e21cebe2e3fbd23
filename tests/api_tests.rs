// tests/api_tests.rs

use std::sync::Arc;

use axum::{body::Body, http::Request};
use comment_tree::{
    config::Config, routes, services::CommentService, state::AppState,
    store::SqliteCommentStore,
};
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        static_dir: None,
    }
}

async fn test_state() -> AppState {
    let config = test_config();
    let store = SqliteCommentStore::connect(&config.database_url)
        .await
        .expect("Failed to open in-memory SQLite for testing.");

    AppState {
        comments: CommentService::new(Arc::new(store)),
        config,
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let app = routes::create_router(test_state().await);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn post_comment(
    client: &reqwest::Client,
    address: &str,
    parent_id: Option<i64>,
    content: &str,
) -> serde_json::Value {
    let response = client
        .post(&format!("{}/comments", address))
        .json(&serde_json::json!({ "parent_id": parent_id, "content": content }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    response.json().await.expect("Failed to parse comment json")
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = routes::create_router(test_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/random_path_that_does_not_exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn create_comment_works() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let root = post_comment(&client, &address, None, "hello").await;
    let reply = post_comment(&client, &address, root["id"].as_i64(), "world").await;

    // Assert
    assert_eq!(root["content"], "hello");
    assert!(root.get("parent_id").is_none());
    assert_eq!(root["created_at"], root["updated_at"]);
    assert_eq!(reply["parent_id"], root["id"]);
}

#[tokio::test]
async fn create_comment_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    for body in [
        serde_json::json!({ "content": "" }),
        serde_json::json!({ "content": "   " }),
        serde_json::json!({ "content": "<script>alert(1)</script>" }),
        serde_json::json!({ "content": "x", "parent_id": 999 }),
    ] {
        let response = client
            .post(&format!("{}/comments", address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 400, "body: {}", body);
        let error: serde_json::Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
    }
}

#[tokio::test]
async fn list_comments_returns_nested_threads() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let root = post_comment(&client, &address, None, "root").await;
    let reply = post_comment(&client, &address, root["id"].as_i64(), "reply").await;
    post_comment(&client, &address, reply["id"].as_i64(), "nested").await;

    let body: serde_json::Value = client
        .get(&format!("{}/comments?page=0&page_size=-1", address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse list json");

    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 50);

    let thread = &body["comments"][0];
    assert_eq!(thread["comment"]["id"], root["id"]);
    assert_eq!(thread["children"][0]["comment"]["id"], reply["id"]);
    assert_eq!(
        thread["children"][0]["children"][0]["comment"]["content"],
        "nested"
    );
    assert!(
        thread["children"][0]["children"][0].get("children").is_none(),
        "leaf nodes omit the children field"
    );
}

#[tokio::test]
async fn list_comments_searches_and_scopes() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let a = post_comment(&client, &address, None, "hello").await;
    let b = post_comment(&client, &address, a["id"].as_i64(), "world").await;
    post_comment(&client, &address, None, "something else").await;

    let found: serde_json::Value = client
        .get(&format!("{}/comments?search=hello", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["comments"].as_array().unwrap().len(), 1);
    assert_eq!(found["comments"][0]["comment"]["id"], a["id"]);
    assert_eq!(found["comments"][0]["children"][0]["comment"]["id"], b["id"]);
    assert_eq!(found["total"], 1);

    let scoped: serde_json::Value = client
        .get(&format!("{}/comments?parent={}", address, b["id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scoped["comments"][0]["comment"]["id"], b["id"]);
    assert_eq!(scoped["total"], 1);
}

#[tokio::test]
async fn get_comment_tree_works() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let root = post_comment(&client, &address, None, "root").await;
    let reply = post_comment(&client, &address, root["id"].as_i64(), "reply").await;

    let tree: serde_json::Value = client
        .get(&format!("{}/comments/{}", address, root["id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tree["comment"]["id"], root["id"]);
    assert_eq!(tree["children"][0]["comment"]["id"], reply["id"]);

    let missing = client
        .get(&format!("{}/comments/424242", address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn delete_comment_cascades() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let root = post_comment(&client, &address, None, "root").await;
    let reply = post_comment(&client, &address, root["id"].as_i64(), "reply").await;
    let nested = post_comment(&client, &address, reply["id"].as_i64(), "nested").await;

    let response = client
        .delete(&format!("{}/comments/{}", address, reply["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    for id in [&reply["id"], &nested["id"]] {
        let gone = client
            .get(&format!("{}/comments/{}", address, id))
            .send()
            .await
            .unwrap();
        assert_eq!(gone.status().as_u16(), 404);
    }

    let tree: serde_json::Value = client
        .get(&format!("{}/comments/{}", address, root["id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(tree.get("children").is_none());

    let again = client
        .delete(&format!("{}/comments/{}", address, reply["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 404);
}

#[tokio::test]
async fn list_comments_ignores_malformed_paging() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    post_comment(&client, &address, None, "root").await;

    for query in ["page=abc&page_size=", "page=1.5", "page_size=&search=root"] {
        let response = client
            .get(&format!("{}/comments?{}", address, query))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200, "query: {}", query);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["page"], 1, "query: {}", query);
        assert_eq!(body["page_size"], 50, "query: {}", query);
        assert_eq!(body["comments"].as_array().unwrap().len(), 1, "query: {}", query);
    }

    let response = client
        .get(&format!("{}/comments?parent=abc", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let error: serde_json::Value = response.json().await.unwrap();
    assert!(error["error"].is_string());
}

#[tokio::test]
async fn search_matches_text_as_it_was_written() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let salt = post_comment(&client, &address, None, "salt & pepper").await;
    post_comment(&client, &address, None, "salt only").await;

    let found: serde_json::Value = client
        .get(&format!("{}/comments", address))
        .query(&[("search", "salt & pepper")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(found["comments"].as_array().unwrap().len(), 1);
    assert_eq!(found["comments"][0]["comment"]["id"], salt["id"]);
    assert_eq!(found["total"], 1);
}

#[tokio::test]
async fn content_limit_applies_to_sanitized_text() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let text = "x".repeat(10_000);
    let with_script = format!("{}<script>alert(1)</script>", text);
    let created = post_comment(&client, &address, None, &with_script).await;
    assert_eq!(created["content"], text);

    let response = client
        .post(&format!("{}/comments", address))
        .json(&serde_json::json!({ "content": format!("{}x", text) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}
