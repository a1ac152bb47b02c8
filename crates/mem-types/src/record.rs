//! Stored memory records and their change history.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One stored memory as returned by list/get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub memory: String,
    pub user_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Search hit: the memory plus its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub item: MemoryItem,
    pub score: f64,
}

/// Kind of change recorded in a memory's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryEventKind {
    Add,
    Update,
    Delete,
}

impl HistoryEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryEventKind::Add => "add",
            HistoryEventKind::Update => "update",
            HistoryEventKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for HistoryEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change to a memory. `old_memory` is absent for adds, `new_memory` for deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: String,
    pub memory_id: String,
    pub user_id: String,
    pub event: HistoryEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_memory: Option<String>,
    pub created_at: String,
}
