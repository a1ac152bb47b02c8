//! Traits for the memory backend and its storage components.

use crate::{HistoryEvent, MemoryItem, ScoredMemory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a vector search hit (id + score).
#[derive(Debug, Clone)]
pub struct VecSearchHit {
    pub id: String,
    pub score: f64,
}

/// Item for vector store (id, vector, payload).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VecStoreItem {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// Vector store abstraction. A `filter` matches items whose payload has every
/// given key with an equal value.
#[async_trait]
pub trait VecStore: Send + Sync {
    /// Insert items; an existing id is rejected.
    async fn add(&self, items: &[VecStoreItem], collection: Option<&str>)
        -> Result<(), VecStoreError>;

    /// Insert or replace items by id.
    async fn upsert(
        &self,
        items: &[VecStoreItem],
        collection: Option<&str>,
    ) -> Result<(), VecStoreError>;

    /// Search by vector, best first.
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
        collection: Option<&str>,
    ) -> Result<Vec<VecSearchHit>, VecStoreError>;

    /// Get by ids; unknown ids are skipped.
    async fn get_by_ids(
        &self,
        ids: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<VecStoreItem>, VecStoreError>;

    /// All items matching the filter, in no particular order.
    async fn list(
        &self,
        filter: Option<&HashMap<String, serde_json::Value>>,
        collection: Option<&str>,
    ) -> Result<Vec<VecStoreItem>, VecStoreError>;

    /// Delete by ids; unknown ids are ignored.
    async fn delete(&self, ids: &[String], collection: Option<&str>) -> Result<(), VecStoreError>;
}

/// Embedder: text -> vector(s).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Default implementation uses embed_batch.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let v = self.embed_batch(&[text.to_string()]).await?;
        v.into_iter().next().ok_or(EmbedderError::EmptyResponse)
    }

    /// Embed multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;
}

/// Append-only log of memory changes.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, event: HistoryEvent) -> Result<(), HistoryStoreError>;

    /// Events for one memory, oldest first.
    async fn list(&self, memory_id: &str) -> Result<Vec<HistoryEvent>, HistoryStoreError>;
}

/// Memory backend the HTTP layer delegates to. Every call is scoped to a
/// caller-supplied user id; another user's memory is reported as `NotFound`.
#[async_trait]
pub trait MemoryClient: Send + Sync {
    /// Store a new memory and return it.
    async fn add(
        &self,
        text: &str,
        user_id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<MemoryItem, MemoryError>;

    /// All memories of a user, oldest first.
    async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryItem>, MemoryError>;

    async fn get(&self, memory_id: &str, user_id: &str) -> Result<MemoryItem, MemoryError>;

    /// At most `limit` of the user's memories, most similar first.
    async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError>;

    /// Replace the text of a memory and return the updated record.
    async fn update(
        &self,
        memory_id: &str,
        text: &str,
        user_id: &str,
    ) -> Result<MemoryItem, MemoryError>;

    async fn delete(&self, memory_id: &str, user_id: &str) -> Result<(), MemoryError>;

    /// Delete every memory of a user; returns how many were removed.
    async fn delete_all(&self, user_id: &str) -> Result<usize, MemoryError>;

    /// Change log of one memory, oldest first. Survives deletion.
    async fn history(
        &self,
        memory_id: &str,
        user_id: &str,
    ) -> Result<Vec<HistoryEvent>, MemoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VecStoreError {
    #[error("vector store io error: {0}")]
    Io(String),
    #[error("vector store serialization error: {0}")]
    Serde(String),
    #[error("vector store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("embedder unavailable: {0}")]
    Unavailable(String),
    #[error("embedder error: {0}")]
    Other(String),
    #[error("empty response")]
    EmptyResponse,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryStoreError {
    #[error("history store error: {0}")]
    Other(String),
}

/// Backend fault taxonomy; the HTTP layer maps each kind to its own status.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("{0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("memory error: {0}")]
    Other(String),
}

impl From<EmbedderError> for MemoryError {
    fn from(e: EmbedderError) -> Self {
        match e {
            EmbedderError::Unavailable(_) => MemoryError::BackendUnavailable(e.to_string()),
            EmbedderError::Other(_) | EmbedderError::EmptyResponse => {
                MemoryError::Other(e.to_string())
            }
        }
    }
}

impl From<VecStoreError> for MemoryError {
    fn from(e: VecStoreError) -> Self {
        match e {
            VecStoreError::Io(_) => MemoryError::BackendUnavailable(e.to_string()),
            VecStoreError::Serde(_) | VecStoreError::Other(_) => MemoryError::Other(e.to_string()),
        }
    }
}

impl From<HistoryStoreError> for MemoryError {
    fn from(e: HistoryStoreError) -> Self {
        MemoryError::Other(e.to_string())
    }
}
