//! Integration tests: add/list, search, update, delete, delete-all, history, error mapping.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mem_api::server::{self, AppState};
use mem_client::LocalMemory;
use mem_embed::HashingEmbedder;
use mem_types::{HistoryEvent, MemoryClient, MemoryError, MemoryItem, ScoredMemory};
use mem_vec::InMemoryVecStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

fn test_app() -> axum::Router {
    let memory: Arc<dyn MemoryClient + Send + Sync> = Arc::new(LocalMemory::new(
        Arc::new(HashingEmbedder::default()),
        Arc::new(InMemoryVecStore::new(None)),
    ));
    server::router(Arc::new(AppState::new(memory)))
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let j = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, j)
}

async fn add(app: &axum::Router, text: &str, user_id: &str) -> String {
    let (status, j) = send(
        app,
        "POST",
        "/v1/memories",
        Some(json!({ "text": text, "user_id": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    j["memory_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn root_and_health() {
    let app = test_app();
    let (status, j) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(j["message"].as_str().unwrap().contains("running"));
    let (status, j) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["status"], "healthy");
}

#[tokio::test]
async fn add_then_list() {
    let app = test_app();
    let (status, j) = send(
        &app,
        "POST",
        "/v1/memories",
        Some(json!({ "text": "likes pizza", "user_id": "u1", "metadata": { "source": "chat" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["success"], true);
    assert_eq!(j["message"], "Memory added successfully");
    let id = j["memory_id"].as_str().unwrap().to_string();

    let (status, j) = send(&app, "GET", "/v1/memories?user_id=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["success"], true);
    assert_eq!(j["count"], 1);
    assert_eq!(j["memories"][0]["id"], id.as_str());
    assert_eq!(j["memories"][0]["memory"], "likes pizza");
    assert_eq!(j["memories"][0]["metadata"]["source"], "chat");

    let (_, j) = send(&app, "GET", "/v1/memories?user_id=u2", None).await;
    assert_eq!(j["count"], 0);
}

#[tokio::test]
async fn user_id_defaults_to_default_user() {
    let app = test_app();
    let id = {
        let body = json!({ "text": "no user given" });
        let (_, j) = send(&app, "POST", "/v1/memories", Some(body)).await;
        j["memory_id"].as_str().unwrap().to_string()
    };
    let (_, j) = send(&app, "GET", "/v1/memories", None).await;
    assert_eq!(j["count"], 1);
    assert_eq!(j["memories"][0]["id"], id.as_str());
    assert_eq!(j["memories"][0]["user_id"], "default_user");
}

#[tokio::test]
async fn get_one_memory() {
    let app = test_app();
    let id = add(&app, "likes pizza", "u1").await;
    let (status, j) = send(&app, "GET", &format!("/v1/memories/{}?user_id=u1", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["memory"]["memory"], "likes pizza");

    let (status, j) = send(&app, "GET", &format!("/v1/memories/{}?user_id=u2", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(j["success"], false);
}

#[tokio::test]
async fn search_finds_match_within_limit() {
    let app = test_app();
    let pizza = add(&app, "likes pizza", "u1").await;
    add(&app, "plays chess on sundays", "u1").await;
    add(&app, "loves dogs", "u1").await;
    add(&app, "likes pizza", "u2").await;

    let (status, j) = send(
        &app,
        "POST",
        "/v1/memories/search",
        Some(json!({ "query": "pizza", "user_id": "u1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["count"], 3);
    assert_eq!(j["results"][0]["id"], pizza.as_str());
    assert!(j["results"][0]["score"].as_f64().unwrap() > 0.0);

    let (_, j) = send(
        &app,
        "POST",
        "/v1/memories/search",
        Some(json!({ "query": "pizza", "user_id": "u1", "limit": 1 })),
    )
    .await;
    assert_eq!(j["count"], 1);
    assert_eq!(j["results"].as_array().unwrap().len(), 1);
    assert_eq!(j["results"][0]["id"], pizza.as_str());

    let (status, _) = send(
        &app,
        "POST",
        "/v1/memories/search",
        Some(json!({ "query": "pizza", "user_id": "u1", "limit": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_changes_retrieval() {
    let app = test_app();
    let id = add(&app, "likes pizza", "u1").await;
    let (status, j) = send(
        &app,
        "PUT",
        &format!("/v1/memories/{}", id),
        Some(json!({ "memory_id": id, "text": "likes sushi", "user_id": "u1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["message"], "Memory updated successfully");

    let (_, j) = send(&app, "GET", "/v1/memories?user_id=u1", None).await;
    assert_eq!(j["memories"][0]["memory"], "likes sushi");

    let uri = format!("/v1/memories/{}/history?user_id=u1", id);
    let (status, j) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["count"], 2);
    assert_eq!(j["history"][0]["event"], "add");
    assert_eq!(j["history"][1]["event"], "update");
    assert_eq!(j["history"][1]["old_memory"], "likes pizza");
}

#[tokio::test]
async fn update_rejects_mismatched_ids_and_unknown_memory() {
    let app = test_app();
    let id = add(&app, "likes pizza", "u1").await;
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/memories/{}", id),
        Some(json!({ "memory_id": "other", "text": "x", "user_id": "u1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, j) = send(
        &app,
        "PUT",
        "/v1/memories/nonexistent-id",
        Some(json!({ "text": "x", "user_id": "u1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(j["message"].as_str().unwrap().starts_with("Error updating memory"));
}

#[tokio::test]
async fn delete_one_and_delete_all() {
    let app = test_app();
    let a = add(&app, "first", "u1").await;
    add(&app, "second", "u1").await;
    add(&app, "third", "u1").await;
    add(&app, "other user", "u2").await;

    let (status, j) = send(&app, "DELETE", &format!("/v1/memories/{}?user_id=u1", a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["message"], "Memory deleted successfully");
    let (_, j) = send(&app, "GET", "/v1/memories?user_id=u1", None).await;
    assert_eq!(j["count"], 2);
    assert!(j["memories"].as_array().unwrap().iter().all(|m| m["id"] != a.as_str()));

    let (status, _) = send(&app, "DELETE", &format!("/v1/memories/{}?user_id=u1", a), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, j) = send(&app, "DELETE", "/v1/memories?user_id=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["message"], "All memories deleted successfully");
    let (_, j) = send(&app, "GET", "/v1/memories?user_id=u1", None).await;
    assert_eq!(j["count"], 0);
    let (_, j) = send(&app, "GET", "/v1/memories?user_id=u2", None).await;
    assert_eq!(j["count"], 1);
}

/// Backend that counts calls and fails every one with a fixed fault.
struct FailingMemory {
    calls: AtomicUsize,
    fault: fn() -> MemoryError,
}

impl FailingMemory {
    fn fail(&self) -> MemoryError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.fault)()
    }
}

#[async_trait::async_trait]
impl MemoryClient for FailingMemory {
    async fn add(
        &self,
        _text: &str,
        _user_id: &str,
        _metadata: HashMap<String, Value>,
    ) -> Result<MemoryItem, MemoryError> {
        Err(self.fail())
    }

    async fn get_all(&self, _user_id: &str) -> Result<Vec<MemoryItem>, MemoryError> {
        Err(self.fail())
    }

    async fn get(&self, _memory_id: &str, _user_id: &str) -> Result<MemoryItem, MemoryError> {
        Err(self.fail())
    }

    async fn search(
        &self,
        _query: &str,
        _user_id: &str,
        _limit: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        Err(self.fail())
    }

    async fn update(
        &self,
        _memory_id: &str,
        _text: &str,
        _user_id: &str,
    ) -> Result<MemoryItem, MemoryError> {
        Err(self.fail())
    }

    async fn delete(&self, _memory_id: &str, _user_id: &str) -> Result<(), MemoryError> {
        Err(self.fail())
    }

    async fn delete_all(&self, _user_id: &str) -> Result<usize, MemoryError> {
        Err(self.fail())
    }

    async fn history(
        &self,
        _memory_id: &str,
        _user_id: &str,
    ) -> Result<Vec<HistoryEvent>, MemoryError> {
        Err(self.fail())
    }
}

fn failing_app(fault: fn() -> MemoryError) -> (axum::Router, Arc<FailingMemory>) {
    let backend = Arc::new(FailingMemory {
        calls: AtomicUsize::new(0),
        fault,
    });
    let memory: Arc<dyn MemoryClient + Send + Sync> = backend.clone();
    (server::router(Arc::new(AppState::new(memory))), backend)
}

#[tokio::test]
async fn backend_faults_map_to_distinct_statuses() {
    let cases: [(fn() -> MemoryError, StatusCode); 4] = [
        (|| MemoryError::NotFound("gone".into()), StatusCode::NOT_FOUND),
        (|| MemoryError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
        (
            || MemoryError::BackendUnavailable("down".into()),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
        (|| MemoryError::Other("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (fault, expected) in cases {
        let (app, _) = failing_app(fault);
        let (status, j) = send(&app, "POST", "/v1/memories", Some(json!({ "text": "x" }))).await;
        assert_eq!(status, expected);
        assert_eq!(j["success"], false);
        assert!(j["message"].as_str().unwrap().starts_with("Error adding memory: "));

        let (status, j) = send(&app, "GET", "/v1/memories", None).await;
        assert_eq!(status, expected);
        assert!(j["message"].as_str().unwrap().starts_with("Error getting memories: "));

        let (status, _) = send(&app, "DELETE", "/v1/memories", None).await;
        assert_eq!(status, expected);
    }
}

#[tokio::test]
async fn backend_unavailable_message_is_surfaced() {
    let (app, _) = failing_app(|| MemoryError::BackendUnavailable("vector store offline".into()));
    let (status, j) = send(
        &app,
        "POST",
        "/v1/memories/search",
        Some(json!({ "query": "pizza" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(j["message"].as_str().unwrap().contains("vector store offline"));
}

#[tokio::test]
async fn malformed_bodies_never_reach_backend() {
    let (app, backend) = failing_app(|| MemoryError::Other("should not be called".into()));

    let bad_requests = [
        ("POST", "/v1/memories", json!({ "user_id": "u1" })),
        ("POST", "/v1/memories", json!({ "text": 5 })),
        ("POST", "/v1/memories/search", json!({ "user_id": "u1", "limit": 3 })),
        ("POST", "/v1/memories/search", json!({ "query": "x", "limit": "ten" })),
        ("PUT", "/v1/memories/m1", json!({ "user_id": "u1" })),
        ("PUT", "/v1/memories/m1", json!({ "memory_id": "m2", "text": "x" })),
    ];
    for (method, uri, body) in bad_requests {
        let (status, _) = send(&app, method, uri, Some(body)).await;
        assert!(status.is_client_error(), "{} {} -> {}", method, uri, status);
    }

    let req = Request::builder()
        .method("POST")
        .uri("/v1/memories")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert!(res.status().is_client_error());

    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}
