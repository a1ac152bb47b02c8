//! JSON-file-backed vector store (persists across restarts).

use crate::memory_vec::{
    delete_in, get_in, insert_new, list_in, search_in, upsert_all, Collections,
    DEFAULT_COLLECTION,
};
use mem_types::{VecSearchHit, VecStore, VecStoreError, VecStoreItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    collections: &'a Collections,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(default)]
    collections: Collections,
}

/// Brute-force store like [`crate::InMemoryVecStore`], but every mutation
/// rewrites a JSON snapshot at `path` before it becomes visible.
pub struct FileVecStore {
    path: PathBuf,
    store: RwLock<Collections>,
    default_collection: String,
}

impl FileVecStore {
    /// Load the snapshot at `path` (or start empty) and create its parent directory.
    pub async fn open(
        path: impl AsRef<Path>,
        default_collection: Option<&str>,
    ) -> Result<Self, VecStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VecStoreError::Io(format!("{}: {}", parent.display(), e)))?;
        }
        let collections = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let snapshot: Snapshot = serde_json::from_str(&content)
                    .map_err(|e| VecStoreError::Serde(format!("{}: {}", path.display(), e)))?;
                if snapshot.version != SNAPSHOT_VERSION {
                    return Err(VecStoreError::Serde(format!(
                        "unsupported snapshot version {} in {}",
                        snapshot.version,
                        path.display()
                    )));
                }
                snapshot.collections
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(VecStoreError::Io(format!("{}: {}", path.display(), e))),
        };
        let count: usize = collections.values().map(HashMap::len).sum();
        tracing::info!(path = %path.display(), items = count, "vector store snapshot loaded");
        Ok(Self {
            path,
            store: RwLock::new(collections),
            default_collection: default_collection
                .unwrap_or(DEFAULT_COLLECTION)
                .to_string(),
        })
    }

    fn coll(&self, collection: Option<&str>) -> String {
        collection
            .unwrap_or(&self.default_collection)
            .to_string()
    }

    async fn persist(&self, collections: &Collections) -> Result<(), VecStoreError> {
        let body = serde_json::to_vec(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            collections,
        })
        .map_err(|e| VecStoreError::Serde(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| VecStoreError::Io(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| VecStoreError::Io(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl VecStore for FileVecStore {
    async fn add(
        &self,
        items: &[VecStoreItem],
        collection: Option<&str>,
    ) -> Result<(), VecStoreError> {
        let coll = self.coll(collection);
        let mut guard = self.store.write().await;
        let mut next = guard.clone();
        insert_new(&mut next, coll, items)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn upsert(
        &self,
        items: &[VecStoreItem],
        collection: Option<&str>,
    ) -> Result<(), VecStoreError> {
        let coll = self.coll(collection);
        let mut guard = self.store.write().await;
        let mut next = guard.clone();
        upsert_all(&mut next, coll, items);
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
        collection: Option<&str>,
    ) -> Result<Vec<VecSearchHit>, VecStoreError> {
        let coll = self.coll(collection);
        let guard = self.store.read().await;
        Ok(search_in(&guard, &coll, query_vector, top_k, filter))
    }

    async fn get_by_ids(
        &self,
        ids: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<VecStoreItem>, VecStoreError> {
        let coll = self.coll(collection);
        let guard = self.store.read().await;
        Ok(get_in(&guard, &coll, ids))
    }

    async fn list(
        &self,
        filter: Option<&HashMap<String, serde_json::Value>>,
        collection: Option<&str>,
    ) -> Result<Vec<VecStoreItem>, VecStoreError> {
        let coll = self.coll(collection);
        let guard = self.store.read().await;
        Ok(list_in(&guard, &coll, filter))
    }

    async fn delete(&self, ids: &[String], collection: Option<&str>) -> Result<(), VecStoreError> {
        let coll = self.coll(collection);
        let mut guard = self.store.write().await;
        let mut next = guard.clone();
        if !delete_in(&mut next, &coll, ids) {
            return Ok(());
        }
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }
}
