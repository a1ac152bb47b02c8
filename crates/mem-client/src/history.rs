//! History logs: in-memory (process lifetime) and JSONL file (survives restarts).

use mem_types::{HistoryEvent, HistoryStore, HistoryStoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

/// memory_id -> events, in append order.
pub struct InMemoryHistoryStore {
    events: RwLock<HashMap<String, Vec<HistoryEvent>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, event: HistoryEvent) -> Result<(), HistoryStoreError> {
        self.events
            .write()
            .await
            .entry(event.memory_id.clone())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn list(&self, memory_id: &str) -> Result<Vec<HistoryEvent>, HistoryStoreError> {
        let guard = self.events.read().await;
        Ok(guard.get(memory_id).cloned().unwrap_or_default())
    }
}

/// One JSON event per line, appended. A missing file reads as no history.
pub struct JsonlHistoryStore {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            append_lock: Mutex::new(()),
        }
    }
}

fn store_err(path: &Path, e: impl std::fmt::Display) -> HistoryStoreError {
    HistoryStoreError::Other(format!("{}: {}", path.display(), e))
}

#[async_trait::async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, event: HistoryEvent) -> Result<(), HistoryStoreError> {
        let mut line =
            serde_json::to_string(&event).map_err(|e| HistoryStoreError::Other(e.to_string()))?;
        line.push('\n');
        let _guard = self.append_lock.lock().await;
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| store_err(&self.path, e))?;
        f.write_all(line.as_bytes())
            .await
            .map_err(|e| store_err(&self.path, e))?;
        f.flush().await.map_err(|e| store_err(&self.path, e))?;
        Ok(())
    }

    async fn list(&self, memory_id: &str) -> Result<Vec<HistoryEvent>, HistoryStoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_err(&self.path, e)),
        };
        let mut out = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event: HistoryEvent =
                serde_json::from_str(line).map_err(|e| store_err(&self.path, e))?;
            if event.memory_id == memory_id {
                out.push(event);
            }
        }
        Ok(out)
    }
}
