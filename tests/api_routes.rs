//! Router tests driven through `tower::ServiceExt::oneshot` on the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use swipefeed::api::{self, AppState};
use swipefeed::config::ApiConfig;
use swipefeed::{Error, InMemoryStore, NewPost, Post, PostStore, User, UserId};

fn api_config() -> ApiConfig {
    ApiConfig {
        port: 0,
        host: "127.0.0.1".to_string(),
        request_timeout: Duration::from_secs(5),
        max_body_size: 64 * 1024,
        cors_enabled: true,
        cors_origins: vec!["*".to_string()],
    }
}

struct TestApp {
    store: InMemoryStore,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let shared = Arc::new(store.clone());
        let state = Arc::new(AppState::new(shared.clone(), shared.clone(), shared));
        Self {
            router: api::router(state, &api_config()),
            store,
        }
    }

    async fn post_by(&self, author: &User, title: &str, category: &str) -> Post {
        self.store
            .create_post(
                author.id,
                NewPost {
                    title: title.to_string(),
                    category: Some(category.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_memory_backend() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn create_post_returns_created() {
    let app = TestApp::new();
    let author = app.store.insert_user("alice").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/posts?author_id={}", author.id),
            Some(json!({ "title": " Rust CLI ", "stack": "rust", "category": "Web" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Rust CLI");
    assert_eq!(body["author_id"], author.id.to_string());

    let (status, listed) = app.send(Method::GET, "/api/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn create_post_validation_errors() {
    let app = TestApp::new();
    let author = app.store.insert_user("alice").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/posts?author_id={}", author.id),
            Some(json!({ "title": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/posts?author_id={}", UserId::new()),
            Some(json!({ "title": "orphan" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn get_post_by_id() {
    let app = TestApp::new();
    let author = app.store.insert_user("alice").await;
    let post = app.post_by(&author, "p1", "Web").await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/posts/{}", post.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], post.id.to_string());

    let (status, _) = app
        .send(Method::GET, &format!("/api/posts/{}", UserId::new()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::GET, "/api/posts/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn posts_by_author_requires_known_user() {
    let app = TestApp::new();
    let alice = app.store.insert_user("alice").await;
    let bob = app.store.insert_user("bob").await;
    let p1 = app.post_by(&alice, "p1", "Web").await;
    app.post_by(&bob, "p2", "ML").await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/posts/user/{}", alice.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![p1.id.to_string()]);

    let (status, _) = app
        .send(Method::GET, &format!("/api/posts/user/{}", UserId::new()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feed_swipe_and_inbox_flow() {
    let app = TestApp::new();
    let alice = app.store.insert_user("alice").await;
    let bob = app.store.insert_user("bob").await;
    let p1 = app.post_by(&alice, "p1", "Web").await;
    let p2 = app.post_by(&alice, "p2", "ML").await;

    let (status, feed) = app
        .send(Method::GET, &format!("/api/posts/feed?user_id={}", bob.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["total"], 2);

    let (status, record) = app
        .send(
            Method::POST,
            "/api/swipes",
            Some(json!({ "user_id": bob.id, "post_id": p1.id, "direction": "left" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["direction"], "LEFT");

    let (status, record) = app
        .send(
            Method::POST,
            "/api/swipes",
            Some(json!({
                "user_id": bob.id,
                "post_id": p2.id,
                "direction": "RIGHT",
                "swiped_at": "2024-05-01T10:00:00Z"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["swiped_at"], "2024-05-01T10:00:00Z");

    let (_, feed) = app
        .send(Method::GET, &format!("/api/posts/feed?user_id={}", bob.id), None)
        .await;
    assert_eq!(feed["total"], 0);

    let (status, inbox) = app
        .send(Method::GET, &format!("/api/swipes/inbox?user_id={}", bob.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = inbox["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["post"]["id"], p2.id.to_string());

    let (status, left) = app
        .send(Method::GET, &format!("/api/swipes/left/{}/ids", bob.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left["post_ids"], json!([p1.id.to_string()]));
}

#[tokio::test]
async fn feed_category_query_is_comma_separated() {
    let app = TestApp::new();
    let alice = app.store.insert_user("alice").await;
    let bob = app.store.insert_user("bob").await;
    app.post_by(&alice, "p1", "Web").await;
    let p2 = app.post_by(&alice, "p2", "ML").await;
    let p3 = app.post_by(&alice, "p3", "Games").await;

    let (status, feed) = app
        .send(
            Method::GET,
            &format!("/api/posts/feed?user_id={}&categories=ml,%20GAMES", bob.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&feed["items"]),
        vec![p2.id.to_string(), p3.id.to_string()]
    );

    let (_, blank) = app
        .send(
            Method::GET,
            &format!("/api/posts/feed?user_id={}&categories=", bob.id),
            None,
        )
        .await;
    assert_eq!(blank["total"], 3);
}

#[tokio::test]
async fn feed_for_unknown_user_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/posts/feed?user_id={}", UserId::new()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn swipe_errors_map_to_status_codes() {
    let app = TestApp::new();
    let alice = app.store.insert_user("alice").await;
    let bob = app.store.insert_user("bob").await;
    let p1 = app.post_by(&alice, "p1", "Web").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/swipes",
            Some(json!({ "user_id": bob.id, "post_id": p1.id, "direction": "up" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/swipes",
            Some(json!({ "user_id": bob.id, "post_id": UserId::new(), "direction": "RIGHT" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/swipes",
            Some(json!({ "user_id": UserId::new(), "post_id": p1.id, "direction": "RIGHT" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.store.swipe_count().await, 0);
}

#[tokio::test]
async fn inbox_and_left_ids_for_unknown_user_are_not_found() {
    let app = TestApp::new();
    let ghost = UserId::new();

    let (status, body) = app
        .send(Method::GET, &format!("/api/swipes/inbox?user_id={}", ghost), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = app
        .send(Method::GET, &format!("/api/swipes/left/{}/ids", ghost), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_requests_get_invalid_argument_body() {
    let app = TestApp::new();
    let alice = app.store.insert_user("alice").await;
    let bob = app.store.insert_user("bob").await;
    let p1 = app.post_by(&alice, "p1", "Web").await;

    // Body missing `direction`
    let (status, body) = app
        .send(
            Method::POST,
            "/api/swipes",
            Some(json!({ "user_id": bob.id, "post_id": p1.id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    // Query missing `user_id`
    let (status, body) = app.send(Method::GET, "/api/posts/feed", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    // Body that is not JSON at all
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/posts?author_id={}", alice.id))
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    assert_eq!(app.store.swipe_count().await, 0);
}

#[tokio::test]
async fn start_server_reports_bind_failure() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = api_config();
    config.port = taken.local_addr().unwrap().port();

    let store = Arc::new(InMemoryStore::new());
    let state = Arc::new(AppState::new(store.clone(), store.clone(), store));

    let result = api::start_server(state, &config, std::future::ready(())).await;
    assert!(matches!(result, Err(Error::Internal { .. })));
}
