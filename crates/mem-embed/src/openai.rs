//! HTTP client for OpenAI-compatible embedding API.

use mem_types::{Embedder, EmbedderError};
use serde::Deserialize;

pub const DEFAULT_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Option<Vec<EmbedItem>>,
}

#[derive(Debug, Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
}

/// Embedder that calls an OpenAI-compatible embedding endpoint (e.g. POST /embeddings).
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    /// Fails when no API key is given; the endpoint is not contacted here.
    pub fn new(
        url: Option<String>,
        api_key: Option<String>,
        model: Option<&str>,
    ) -> Result<Self, EmbedderError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EmbedderError::Other("embedding api key is not set".to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            api_key,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut all = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({
                "input": text,
                "model": self.model
            });
            let res = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| EmbedderError::Unavailable(e.to_string()))?;
            let status = res.status();
            let body = res
                .text()
                .await
                .map_err(|e| EmbedderError::Unavailable(e.to_string()))?;
            if !status.is_success() {
                return Err(EmbedderError::Unavailable(format!(
                    "embed API error {}: {}",
                    status, body
                )));
            }
            let parsed: EmbedResponse =
                serde_json::from_str(&body).map_err(|e| EmbedderError::Other(e.to_string()))?;
            let embedding = parsed
                .data
                .and_then(|d| d.into_iter().next())
                .map(|i| i.embedding)
                .ok_or(EmbedderError::EmptyResponse)?;
            all.push(embedding);
        }
        Ok(all)
    }
}
