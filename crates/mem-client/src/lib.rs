//! Local memory backend: composes an embedder, a vector store and a history log
//! behind the `MemoryClient` trait, plus the configuration used to build it.

mod config;
mod history;
mod local;

pub use config::{
    build_memory, history_path_for, init_with_fallback, EmbedderConfig, MemoryConfig,
    VectorStoreConfig, FALLBACK_STORE_PATH,
};
pub use history::{InMemoryHistoryStore, JsonlHistoryStore};
pub use local::LocalMemory;
pub use mem_types::{MemoryClient, MemoryError};
