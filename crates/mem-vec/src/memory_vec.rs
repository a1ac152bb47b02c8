//! In-memory vector store (brute-force KNN).

use mem_types::{VecSearchHit, VecStore, VecStoreError, VecStoreItem};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub(crate) const DEFAULT_COLLECTION: &str = "memories";

/// collection name -> id -> item
pub(crate) type Collections = HashMap<String, HashMap<String, VecStoreItem>>;

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

pub(crate) fn matches_filter(
    item: &VecStoreItem,
    filter: Option<&HashMap<String, serde_json::Value>>,
) -> bool {
    match filter {
        None => true,
        Some(f) => f.iter().all(|(k, v)| item.payload.get(k) == Some(v)),
    }
}

pub(crate) fn insert_new(
    colls: &mut Collections,
    coll: String,
    items: &[VecStoreItem],
) -> Result<(), VecStoreError> {
    let map = colls.entry(coll).or_default();
    if let Some(dup) = items.iter().find(|i| map.contains_key(&i.id)) {
        return Err(VecStoreError::Other(format!("duplicate id: {}", dup.id)));
    }
    for item in items {
        map.insert(item.id.clone(), item.clone());
    }
    Ok(())
}

pub(crate) fn upsert_all(colls: &mut Collections, coll: String, items: &[VecStoreItem]) {
    let map = colls.entry(coll).or_default();
    for item in items {
        map.insert(item.id.clone(), item.clone());
    }
}

pub(crate) fn search_in(
    colls: &Collections,
    coll: &str,
    query_vector: &[f32],
    top_k: usize,
    filter: Option<&HashMap<String, serde_json::Value>>,
) -> Vec<VecSearchHit> {
    let Some(map) = colls.get(coll) else {
        return Vec::new();
    };
    let mut candidates: Vec<VecSearchHit> = map
        .values()
        .filter(|i| matches_filter(i, filter))
        .map(|i| VecSearchHit {
            id: i.id.clone(),
            score: cosine_similarity(query_vector, &i.vector),
        })
        .collect();
    // Ties broken by id so equal scores come back in a stable order.
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(top_k);
    candidates
}

pub(crate) fn get_in(colls: &Collections, coll: &str, ids: &[String]) -> Vec<VecStoreItem> {
    let Some(m) = colls.get(coll) else {
        return Vec::new();
    };
    ids.iter().filter_map(|id| m.get(id).cloned()).collect()
}

pub(crate) fn list_in(
    colls: &Collections,
    coll: &str,
    filter: Option<&HashMap<String, serde_json::Value>>,
) -> Vec<VecStoreItem> {
    colls
        .get(coll)
        .map(|m| {
            m.values()
                .filter(|i| matches_filter(i, filter))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Returns true when anything was removed.
pub(crate) fn delete_in(colls: &mut Collections, coll: &str, ids: &[String]) -> bool {
    let mut removed = false;
    if let Some(m) = colls.get_mut(coll) {
        for id in ids {
            removed |= m.remove(id).is_some();
        }
    }
    removed
}

/// In-memory VecStore: stores items in a map, search by brute-force cosine similarity.
pub struct InMemoryVecStore {
    store: Arc<RwLock<Collections>>,
    default_collection: String,
}

impl InMemoryVecStore {
    pub fn new(default_collection: Option<&str>) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            default_collection: default_collection
                .unwrap_or(DEFAULT_COLLECTION)
                .to_string(),
        }
    }

    fn coll(&self, collection: Option<&str>) -> String {
        collection
            .unwrap_or(&self.default_collection)
            .to_string()
    }
}

#[async_trait::async_trait]
impl VecStore for InMemoryVecStore {
    async fn add(
        &self,
        items: &[VecStoreItem],
        collection: Option<&str>,
    ) -> Result<(), VecStoreError> {
        let coll = self.coll(collection);
        let mut guard = self.store.write().await;
        insert_new(&mut guard, coll, items)
    }

    async fn upsert(
        &self,
        items: &[VecStoreItem],
        collection: Option<&str>,
    ) -> Result<(), VecStoreError> {
        let coll = self.coll(collection);
        let mut guard = self.store.write().await;
        upsert_all(&mut guard, coll, items);
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
        delete_in(&mut guard, &coll, ids);
        Ok(())
    }
}
