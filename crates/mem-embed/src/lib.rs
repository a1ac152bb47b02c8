//! Embedding clients: OpenAI-compatible HTTP and an offline hashing embedder.

mod hashing;
mod openai;

pub use hashing::{HashingEmbedder, DEFAULT_DIMS};
pub use mem_types::{Embedder, EmbedderError};
pub use openai::OpenAiEmbedder;
