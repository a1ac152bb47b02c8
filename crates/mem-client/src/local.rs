//! LocalMemory: one record per vector store item, history in a side log.

use crate::history::InMemoryHistoryStore;
use chrono::{SecondsFormat, Utc};
use mem_types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const KEY_MEMORY: &str = "memory";
const KEY_USER_ID: &str = "user_id";
const KEY_METADATA: &str = "metadata";
const KEY_CREATED_AT: &str = "created_at";
const KEY_UPDATED_AT: &str = "updated_at";

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn not_found(memory_id: &str) -> MemoryError {
    MemoryError::NotFound(format!("memory not found: {}", memory_id))
}

fn require_text(field: &str, value: &str) -> Result<(), MemoryError> {
    if value.trim().is_empty() {
        return Err(MemoryError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn user_filter(user_id: &str) -> HashMap<String, serde_json::Value> {
    let mut f = HashMap::new();
    f.insert(
        KEY_USER_ID.to_string(),
        serde_json::Value::String(user_id.to_string()),
    );
    f
}

fn payload_for(item: &MemoryItem) -> HashMap<String, serde_json::Value> {
    let mut p = HashMap::new();
    p.insert(
        KEY_MEMORY.to_string(),
        serde_json::Value::String(item.memory.clone()),
    );
    p.insert(
        KEY_USER_ID.to_string(),
        serde_json::Value::String(item.user_id.clone()),
    );
    p.insert(KEY_METADATA.to_string(), serde_json::json!(item.metadata));
    p.insert(
        KEY_CREATED_AT.to_string(),
        serde_json::Value::String(item.created_at.clone()),
    );
    if let Some(ref updated_at) = item.updated_at {
        p.insert(
            KEY_UPDATED_AT.to_string(),
            serde_json::Value::String(updated_at.clone()),
        );
    }
    p
}

fn item_from_store(item: VecStoreItem) -> Result<MemoryItem, MemoryError> {
    let str_field = |key: &str| -> Result<String, MemoryError> {
        item.payload
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| MemoryError::Other(format!("record {} has no {}", item.id, key)))
    };
    let memory = str_field(KEY_MEMORY)?;
    let user_id = str_field(KEY_USER_ID)?;
    let created_at = str_field(KEY_CREATED_AT)?;
    let updated_at = str_field(KEY_UPDATED_AT).ok();
    let metadata = match item.payload.get(KEY_METADATA) {
        Some(serde_json::Value::Object(m)) => m.clone().into_iter().collect(),
        _ => HashMap::new(),
    };
    Ok(MemoryItem {
        id: item.id,
        memory,
        user_id,
        metadata,
        created_at,
        updated_at,
    })
}

/// Memory backend composed of an embedder, a vector store and a history log.
///
/// Mutations are serialized by an internal lock so an update cannot race a
/// delete of the same record; reads go straight to the store.
pub struct LocalMemory {
    embedder: Arc<dyn Embedder + Send + Sync>,
    vec_store: Arc<dyn VecStore + Send + Sync>,
    history: Arc<dyn HistoryStore + Send + Sync>,
    write_lock: Mutex<()>,
}

impl LocalMemory {
    pub fn new(
        embedder: Arc<dyn Embedder + Send + Sync>,
        vec_store: Arc<dyn VecStore + Send + Sync>,
    ) -> Self {
        Self {
            embedder,
            vec_store,
            history: Arc::new(InMemoryHistoryStore::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the default in-memory history log.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore + Send + Sync>) -> Self {
        self.history = history;
        self
    }

    /// Fetch one record, treating another user's record as absent.
    async fn load_owned(&self, memory_id: &str, user_id: &str) -> Result<MemoryItem, MemoryError> {
        let mut found = self
            .vec_store
            .get_by_ids(&[memory_id.to_string()], None)
            .await?;
        let item = found.pop().ok_or_else(|| not_found(memory_id))?;
        let item = item_from_store(item)?;
        if item.user_id != user_id {
            return Err(not_found(memory_id));
        }
        Ok(item)
    }

    async fn record(
        &self,
        kind: HistoryEventKind,
        memory_id: &str,
        user_id: &str,
        old_memory: Option<String>,
        new_memory: Option<String>,
    ) -> Result<(), MemoryError> {
        self.history
            .append(HistoryEvent {
                id: Uuid::new_v4().to_string(),
                memory_id: memory_id.to_string(),
                user_id: user_id.to_string(),
                event: kind,
                old_memory,
                new_memory,
                created_at: now_iso(),
            })
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MemoryClient for LocalMemory {
    async fn add(
        &self,
        text: &str,
        user_id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<MemoryItem, MemoryError> {
        require_text("text", text)?;
        require_text("user_id", user_id)?;
        let vector = self.embedder.embed(text).await?;
        let item = MemoryItem {
            id: Uuid::new_v4().to_string(),
            memory: text.to_string(),
            user_id: user_id.to_string(),
            metadata,
            created_at: now_iso(),
            updated_at: None,
        };
        let stored = VecStoreItem {
            id: item.id.clone(),
            vector,
            payload: payload_for(&item),
        };

        let _guard = self.write_lock.lock().await;
        self.vec_store.add(&[stored], None).await?;
        self.record(
            HistoryEventKind::Add,
            &item.id,
            user_id,
            None,
            Some(item.memory.clone()),
        )
        .await?;
        tracing::debug!(memory_id = %item.id, user_id, "memory stored");
        Ok(item)
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryItem>, MemoryError> {
        let filter = user_filter(user_id);
        let stored = self.vec_store.list(Some(&filter), None).await?;
        let mut items = stored
            .into_iter()
            .map(item_from_store)
            .collect::<Result<Vec<_>, _>>()?;
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(items)
    }

    async fn get(&self, memory_id: &str, user_id: &str) -> Result<MemoryItem, MemoryError> {
        self.load_owned(memory_id, user_id).await
    }

    async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        require_text("query", query)?;
        if limit == 0 {
            return Err(MemoryError::InvalidInput(
                "limit must be greater than 0".to_string(),
            ));
        }
        let query_vector = self.embedder.embed(query).await?;
        let filter = user_filter(user_id);
        let hits = self
            .vec_store
            .search(&query_vector, limit, Some(&filter), None)
            .await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let mut by_id: HashMap<String, MemoryItem> = HashMap::new();
        for stored in self.vec_store.get_by_ids(&ids, None).await? {
            let item = item_from_store(stored)?;
            by_id.insert(item.id.clone(), item);
        }
        // A record deleted between search and fetch is simply dropped.
        Ok(hits
            .into_iter()
            .filter_map(|h| {
                by_id.remove(&h.id).map(|item| ScoredMemory {
                    item,
                    score: h.score,
                })
            })
            .collect())
    }

    async fn update(
        &self,
        memory_id: &str,
        text: &str,
        user_id: &str,
    ) -> Result<MemoryItem, MemoryError> {
        require_text("text", text)?;
        let vector = self.embedder.embed(text).await?;

        let _guard = self.write_lock.lock().await;
        let mut item = self.load_owned(memory_id, user_id).await?;
        let old_memory = std::mem::replace(&mut item.memory, text.to_string());
        item.updated_at = Some(now_iso());
        let stored = VecStoreItem {
            id: item.id.clone(),
            vector,
            payload: payload_for(&item),
        };
        self.vec_store.upsert(&[stored], None).await?;
        self.record(
            HistoryEventKind::Update,
            memory_id,
            user_id,
            Some(old_memory),
            Some(item.memory.clone()),
        )
        .await?;
        Ok(item)
    }

    async fn delete(&self, memory_id: &str, user_id: &str) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock().await;
        let item = self.load_owned(memory_id, user_id).await?;
        self.vec_store
            .delete(&[memory_id.to_string()], None)
            .await?;
        self.record(
            HistoryEventKind::Delete,
            memory_id,
            user_id,
            Some(item.memory),
            None,
        )
        .await
    }

    async fn delete_all(&self, user_id: &str) -> Result<usize, MemoryError> {
        let _guard = self.write_lock.lock().await;
        let filter = user_filter(user_id);
        let stored = self.vec_store.list(Some(&filter), None).await?;
        if stored.is_empty() {
            return Ok(0);
        }
        let items = stored
            .into_iter()
            .map(item_from_store)
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
        self.vec_store.delete(&ids, None).await?;
        for item in &items {
            self.record(
                HistoryEventKind::Delete,
                &item.id,
                user_id,
                Some(item.memory.clone()),
                None,
            )
            .await?;
        }
        Ok(items.len())
    }

    async fn history(
        &self,
        memory_id: &str,
        user_id: &str,
    ) -> Result<Vec<HistoryEvent>, MemoryError> {
        let events: Vec<HistoryEvent> = self
            .history
            .list(memory_id)
            .await?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        if events.is_empty() {
            return Err(not_found(memory_id));
        }
        Ok(events)
    }
}
