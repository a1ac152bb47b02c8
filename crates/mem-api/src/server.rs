//! Axum server and routes.

use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use mem_types::{
    AddMemoryRequest, AddMemoryResponse, GetMemoryResponse, HistoryResponse,
    ListMemoriesResponse, MemoryClient, MessageResponse, SearchMemoryRequest,
    SearchMemoryResponse, UpdateMemoryRequest, UserQuery,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub memory: Arc<dyn MemoryClient + Send + Sync>,
}

impl AppState {
    pub fn new(memory: Arc<dyn MemoryClient + Send + Sync>) -> Self {
        Self { memory }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route(
            "/v1/memories",
            post(handle_add).get(handle_list).delete(handle_delete_all),
        )
        .route("/v1/memories/search", post(handle_search))
        .route(
            "/v1/memories/:memory_id",
            get(handle_get).put(handle_update).delete(handle_delete),
        )
        .route("/v1/memories/:memory_id/history", get(handle_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Memory API is running!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn handle_add(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddMemoryRequest>,
) -> Result<Json<AddMemoryResponse>, ApiError> {
    let user_id = req.user_id();
    let item = state
        .memory
        .add(&req.text, user_id, req.metadata())
        .await
        .map_err(ApiError::memory("Error adding memory"))?;
    tracing::info!(memory_id = %item.id, user_id, "memory added");
    Ok(Json(AddMemoryResponse {
        success: true,
        memory_id: item.id,
        message: "Memory added successfully".to_string(),
    }))
}

async fn handle_list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> Result<Json<ListMemoriesResponse>, ApiError> {
    let memories = state
        .memory
        .get_all(q.user_id())
        .await
        .map_err(ApiError::memory("Error getting memories"))?;
    Ok(Json(ListMemoriesResponse {
        success: true,
        count: memories.len(),
        memories,
    }))
}

async fn handle_get(
    State(state): State<Arc<AppState>>,
    Path(memory_id): Path<String>,
    Query(q): Query<UserQuery>,
) -> Result<Json<GetMemoryResponse>, ApiError> {
    let memory = state
        .memory
        .get(&memory_id, q.user_id())
        .await
        .map_err(ApiError::memory("Error getting memory"))?;
    Ok(Json(GetMemoryResponse {
        success: true,
        memory,
    }))
}

async fn handle_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchMemoryRequest>,
) -> Result<Json<SearchMemoryResponse>, ApiError> {
    let results = state
        .memory
        .search(&req.query, req.user_id(), req.limit())
        .await
        .map_err(ApiError::memory("Error searching memories"))?;
    Ok(Json(SearchMemoryResponse {
        success: true,
        count: results.len(),
        results,
    }))
}

async fn handle_update(
    State(state): State<Arc<AppState>>,
    Path(memory_id): Path<String>,
    Json(req): Json<UpdateMemoryRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(ref body_id) = req.memory_id {
        if *body_id != memory_id {
            return Err(ApiError::BadRequest(format!(
                "Error updating memory: memory_id in body ({}) does not match path ({})",
                body_id, memory_id
            )));
        }
    }
    let user_id = req.user_id();
    state
        .memory
        .update(&memory_id, &req.text, user_id)
        .await
        .map_err(ApiError::memory("Error updating memory"))?;
    tracing::info!(memory_id = %memory_id, user_id, "memory updated");
    Ok(Json(MessageResponse::ok("Memory updated successfully")))
}

async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Path(memory_id): Path<String>,
    Query(q): Query<UserQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .memory
        .delete(&memory_id, q.user_id())
        .await
        .map_err(ApiError::memory("Error deleting memory"))?;
    tracing::info!(memory_id = %memory_id, user_id = q.user_id(), "memory deleted");
    Ok(Json(MessageResponse::ok("Memory deleted successfully")))
}

async fn handle_delete_all(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state
        .memory
        .delete_all(q.user_id())
        .await
        .map_err(ApiError::memory("Error deleting all memories"))?;
    tracing::info!(user_id = q.user_id(), removed, "all memories deleted");
    Ok(Json(MessageResponse::ok("All memories deleted successfully")))
}

async fn handle_history(
    State(state): State<Arc<AppState>>,
    Path(memory_id): Path<String>,
    Query(q): Query<UserQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state
        .memory
        .history(&memory_id, q.user_id())
        .await
        .map_err(ApiError::memory("Error getting memory history"))?;
    Ok(Json(HistoryResponse {
        success: true,
        count: history.len(),
        history,
    }))
}
