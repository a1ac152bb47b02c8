//! Vector store trait with in-memory and file-backed implementations.

mod file_vec;
mod memory_vec;

pub use file_vec::FileVecStore;
pub use mem_types::{VecSearchHit, VecStore, VecStoreError, VecStoreItem};
pub use memory_vec::InMemoryVecStore;
