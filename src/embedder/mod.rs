//! The embedder interface (spec.md §6) — the external collaborator that
//! turns text into vectors. The core crate never does network I/O or
//! reads environment variables itself; only a concrete `Embedder` impl
//! (e.g. [`ollama::OllamaEmbedder`]) does.

pub mod mock;
pub mod ollama;

use async_trait::async_trait;

use crate::errors::VectorDbResult;

/// Produces embeddings for text. Implementations must return the same
/// dimension from every call within one database's lifetime (spec.md §6).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The dimension this embedder produces. May fail (e.g. a model host
    /// that needs a round trip to report it).
    async fn dimension(&self) -> VectorDbResult<usize>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> VectorDbResult<Vec<f32>>;

    /// Embed a batch of texts in one call. The returned vector's length
    /// must equal `texts.len()`; the orchestrator treats a mismatch as
    /// `InvalidInput` (spec.md §4.5).
    async fn embed_batch(&self, texts: &[String]) -> VectorDbResult<Vec<Vec<f32>>>;
}
