//! A deterministic, zero-dependency embedder for tests.
//!
//! Grounded on the teacher's own test fixtures, which fabricate embedding
//! vectors by a simple formula (`vec![0.1*i, 0.2*i, 0.3*i]` in
//! `vector_db/mod.rs`'s test module) rather than calling a real model —
//! generalized here into a reusable test double that hashes text into a
//! fixed-dimension vector.

use async_trait::async_trait;

use crate::errors::VectorDbResult;

use super::Embedder;

/// Embeds text by hashing it into `dimension` floats. Two calls with the
/// same text always produce the same vector; this is good enough to
/// exercise round-trip and ranking behavior in tests without a model host.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        let mut state: u64 = 1469598103934665603; // FNV offset basis
        for byte in text.bytes() {
            state ^= byte as u64;
            state = state.wrapping_mul(1099511628211); // FNV prime
        }
        (0..self.dimension)
            .map(|i| {
                let mixed = state.wrapping_add(i as u64).wrapping_mul(2654435761);
                // Map into [-1, 1] via the upper bits, avoiding an
                // all-zero vector for non-empty text.
                ((mixed >> 40) as i64 % 2000 - 1000) as f32 / 1000.0
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn dimension(&self) -> VectorDbResult<usize> {
        Ok(self.dimension)
    }

    async fn embed(&self, text: &str) -> VectorDbResult<Vec<f32>> {
        Ok(self.hash_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> VectorDbResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.hash_vector(t)).collect())
    }
}
