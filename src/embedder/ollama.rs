//! An `Embedder` backed by a local Ollama model host.
//!
//! Ported from the teacher's `ollama_client.rs` + `embedding_generator.rs`
//! and trimmed to exactly what the `Embedder` trait needs: request/response
//! shapes for `/api/embeddings`, a configurable base URL, and the
//! `OLLAMA_HOST`-style environment override spec.md §6 allows an embedder
//! (never the core) to consult.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{VectorDbError, VectorDbResult};

use super::Embedder;

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl OllamaConfig {
    /// Build config from the `OLLAMA_HOST` environment variable when set,
    /// falling back to the local default — the core crate never reads this
    /// variable itself (spec.md §6).
    pub fn from_env(model: impl Into<String>) -> Self {
        let base_url = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string());
        Self {
            base_url,
            model: model.into(),
            timeout_ms: 30_000,
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedder that calls a running Ollama instance's `/api/embeddings`
/// endpoint once per text (Ollama has no batch endpoint, so
/// `embed_batch` fans out sequentially — matching the teacher's own
/// fallback-to-individual-requests behavior when a batch call isn't
/// available).
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    config: OllamaConfig,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaConfig) -> VectorDbResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| VectorDbError::Storage(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn embed_one(&self, text: &str) -> VectorDbResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(VectorDbError::InvalidInput(
                "cannot embed empty text".to_string(),
            ));
        }

        let url = format!("{}/api/embeddings", self.config.base_url);
        let request = EmbeddingRequest {
            model: &self.config.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorDbError::LoadFailed(format!("ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VectorDbError::LoadFailed(format!(
                "ollama returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| VectorDbError::LoadFailed(format!("invalid ollama response: {e}")))?;

        if parsed.embedding.is_empty() {
            return Err(VectorDbError::LoadFailed(
                "ollama returned an empty embedding".to_string(),
            ));
        }

        Ok(parsed.embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn dimension(&self) -> VectorDbResult<usize> {
        let probe = self.embed_one("dimension probe").await?;
        Ok(probe.len())
    }

    async fn embed(&self, text: &str) -> VectorDbResult<Vec<f32>> {
        self.embed_one(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> VectorDbResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_one(text).await?);
        }
        Ok(out)
    }
}
