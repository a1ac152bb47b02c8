//! Backend configuration and start-up construction with a single fallback.

use crate::{JsonlHistoryStore, LocalMemory};
use mem_embed::{HashingEmbedder, OpenAiEmbedder, DEFAULT_DIMS};
use mem_types::{Embedder, MemoryClient, MemoryError, VecStore};
use mem_vec::{FileVecStore, InMemoryVecStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the fallback configuration keeps its vector snapshot.
pub const FALLBACK_STORE_PATH: &str = "/app/data/vector_store.json";

/// `File` keeps the vector snapshot at `path` and the history log beside it
/// (see [`history_path_for`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "config", rename_all = "snake_case")]
pub enum VectorStoreConfig {
    #[default]
    Memory,
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "config", rename_all = "snake_case")]
pub enum EmbedderConfig {
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default)]
        api_base: Option<String>,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Hashing {
        #[serde(default = "default_dims")]
        dims: usize,
    },
}

fn default_dims() -> usize {
    DEFAULT_DIMS
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        EmbedderConfig::OpenAi {
            api_base: None,
            api_key: None,
            model: None,
        }
    }
}

/// Backend configuration, deserializable from JSON:
/// `{"vector_store": {"provider": "file", "config": {"path": "..."}},
///   "embedder": {"provider": "hashing", "config": {"dims": 256}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub collection: Option<String>,
}

impl MemoryConfig {
    /// Primary configuration from the process environment.
    pub fn from_env() -> Result<Self, MemoryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `MEMORY_CONFIG` names a JSON file that replaces the whole configuration;
    /// otherwise an OpenAI embedder (`EMBED_API_URL`, `EMBED_API_KEY`,
    /// `EMBED_MODEL`) over an in-memory vector store.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MemoryError> {
        if let Some(path) = lookup("MEMORY_CONFIG") {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| MemoryError::Config(format!("{}: {}", path, e)))?;
            return Self::from_json(&content);
        }
        Ok(Self {
            vector_store: VectorStoreConfig::Memory,
            embedder: EmbedderConfig::OpenAi {
                api_base: lookup("EMBED_API_URL"),
                api_key: lookup("EMBED_API_KEY"),
                model: lookup("EMBED_MODEL"),
            },
            collection: None,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, MemoryError> {
        serde_json::from_str(content).map_err(|e| MemoryError::Config(e.to_string()))
    }

    /// Offline configuration: hashing embedder over a file snapshot at
    /// [`FALLBACK_STORE_PATH`].
    pub fn fallback() -> Self {
        Self {
            vector_store: VectorStoreConfig::File {
                path: PathBuf::from(FALLBACK_STORE_PATH),
            },
            embedder: EmbedderConfig::Hashing {
                dims: DEFAULT_DIMS,
            },
            collection: None,
        }
    }
}

/// History log path for a snapshot path: `vector_store.json` ->
/// `vector_store.history.jsonl`.
pub fn history_path_for(snapshot: &Path) -> PathBuf {
    snapshot.with_extension("history.jsonl")
}

/// Construct a backend from configuration.
pub async fn build_memory(
    config: &MemoryConfig,
) -> Result<Arc<dyn MemoryClient + Send + Sync>, MemoryError> {
    let embedder: Arc<dyn Embedder + Send + Sync> = match &config.embedder {
        EmbedderConfig::OpenAi {
            api_base,
            api_key,
            model,
        } => Arc::new(
            OpenAiEmbedder::new(api_base.clone(), api_key.clone(), model.as_deref())
                .map_err(|e| MemoryError::Config(e.to_string()))?,
        ),
        EmbedderConfig::Hashing { dims } => Arc::new(HashingEmbedder::new(*dims)),
    };
    let collection = config.collection.as_deref();
    let memory = match &config.vector_store {
        VectorStoreConfig::Memory => {
            LocalMemory::new(embedder, Arc::new(InMemoryVecStore::new(collection)))
        }
        VectorStoreConfig::File { path } => {
            let vec_store: Arc<dyn VecStore + Send + Sync> =
                Arc::new(FileVecStore::open(path, collection).await?);
            LocalMemory::new(embedder, vec_store)
                .with_history(Arc::new(JsonlHistoryStore::new(history_path_for(path))))
        }
    };
    Ok(Arc::new(memory))
}

/// Build from `primary`; on failure log it and try `fallback` exactly once.
pub async fn init_with_fallback(
    primary: &MemoryConfig,
    fallback: &MemoryConfig,
) -> Result<Arc<dyn MemoryClient + Send + Sync>, MemoryError> {
    match build_memory(primary).await {
        Ok(memory) => Ok(memory),
        Err(primary_err) => {
            tracing::warn!(
                error = %primary_err,
                "memory backend init failed, trying fallback config"
            );
            build_memory(fallback).await.map_err(|fallback_err| {
                MemoryError::Config(format!(
                    "primary: {}; fallback: {}",
                    primary_err, fallback_err
                ))
            })
        }
    }
}
