//! Request and response DTOs for the `/v1/memories` API.

use crate::{HistoryEvent, MemoryItem, ScoredMemory};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User id applied when a request omits `user_id` (or sends null).
pub const DEFAULT_USER_ID: &str = "default_user";

/// Search result cap applied when a request omits `limit`.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

fn resolve_user_id(user_id: &Option<String>) -> &str {
    user_id.as_deref().unwrap_or(DEFAULT_USER_ID)
}

/// Add-memory request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemoryRequest {
    pub text: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl AddMemoryRequest {
    pub fn user_id(&self) -> &str {
        resolve_user_id(&self.user_id)
    }

    /// Metadata to store: the caller's map, or an empty one.
    pub fn metadata(&self) -> HashMap<String, serde_json::Value> {
        self.metadata.clone().unwrap_or_default()
    }
}

/// Search request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMemoryRequest {
    pub query: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl SearchMemoryRequest {
    pub fn user_id(&self) -> &str {
        resolve_user_id(&self.user_id)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT) as usize
    }
}

/// Update request body. `memory_id` is optional because the path carries it;
/// when both are given they must agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemoryRequest {
    #[serde(default)]
    pub memory_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl UpdateMemoryRequest {
    pub fn user_id(&self) -> &str {
        resolve_user_id(&self.user_id)
    }
}

/// `?user_id=` query for list, get, delete, delete-all and history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

impl UserQuery {
    pub fn user_id(&self) -> &str {
        resolve_user_id(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemoryResponse {
    pub success: bool,
    pub memory_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMemoriesResponse {
    pub success: bool,
    pub memories: Vec<MemoryItem>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMemoryResponse {
    pub success: bool,
    pub memory: MemoryItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMemoryResponse {
    pub success: bool,
    pub results: Vec<ScoredMemory>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryEvent>,
    pub count: usize,
}

/// Body for update/delete acknowledgements and for every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
