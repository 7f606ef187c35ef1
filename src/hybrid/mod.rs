//! The hybrid search engine: fuses vector similarity with an external
//! lexical (BM25) engine via linear score blending (spec.md §4.4).
//!
//! Grounded on `other_examples/…cocode-rs-retrieval-src-search-hybrid.rs`'s
//! `HybridSearcher`, which composes `Arc<dyn VectorStore>` with an optional
//! `Arc<dyn EmbeddingProvider>` and `Arc<Bm25Searcher>` and fans out to both
//! concurrently. That example fuses with reciprocal rank fusion; spec.md §4.4
//! calls for the simpler linear `vectorWeight` blend instead, so only the
//! dual-engine composition and concurrent-fan-out shape are carried over.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{HybridConfig, SearchOptions};
use crate::document::Document;
use crate::errors::VectorDbResult;
use crate::search::{finalize_results, SearchEngine, SearchQuery, SearchResult, VectorSearchEngine};
use crate::storage::StorageProvider;

/// The lexical half of a hybrid search: an external BM25-style engine the
/// vector database treats as an opaque collaborator (spec.md §4.4 and §1's
/// Non-goal "BM25 internals"). Scores are whatever scale the engine
/// produces; [`HybridConfig::bm25_normalization_factor`] maps them into
/// roughly `[0, 1]` before fusion.
#[async_trait]
pub trait TextEngine: Send + Sync {
    /// Lexical search over `query`, returning up to `options.num_results`
    /// matches. `threshold`, if present, is a lexical-score cutoff in the
    /// engine's own scale — callers fanning out for fusion pass `None` and
    /// a raised `num_results` so fusion sees a wide candidate set.
    async fn search(&self, query: &str, options: &SearchOptions) -> VectorDbResult<Vec<SearchResult>>;

    /// Add or update `doc` in the lexical index.
    async fn index_document(&self, doc: &Document) -> VectorDbResult<()>;

    /// Remove a document from the lexical index. Idempotent.
    async fn remove_document(&self, id: &str) -> VectorDbResult<()>;
}

/// Combines a [`VectorSearchEngine`] with a [`TextEngine`] per spec.md §4.4:
/// vector queries delegate entirely to the vector engine; text queries fan
/// out to both engines concurrently and fuse the results with a linear
/// weighted blend.
pub struct HybridSearchEngine {
    vector_engine: VectorSearchEngine,
    text_engine: Arc<dyn TextEngine>,
    config: HybridConfig,
}

impl HybridSearchEngine {
    pub fn new(vector_engine: VectorSearchEngine, text_engine: Arc<dyn TextEngine>, config: HybridConfig) -> Self {
        Self {
            vector_engine,
            text_engine,
            config,
        }
    }

    /// §4.4: embed the query once, fan out concurrently to both engines at
    /// `2 * num_results` candidates with no threshold, then fuse.
    async fn search_text(
        &self,
        text: &str,
        storage: &dyn StorageProvider,
        options: &SearchOptions,
        dimension: usize,
    ) -> VectorDbResult<Vec<SearchResult>> {
        let fanout_options = SearchOptions::new(options.num_results.saturating_mul(2).max(1), None)?;

        let vector_query = SearchQuery::Text(text.to_string());
        let (vector_results, text_results) = tokio::join!(
            self.vector_engine.search(&vector_query, storage, &fanout_options, Some(dimension)),
            self.text_engine.search(text, &fanout_options),
        );
        let vector_results = vector_results?;
        let text_results = text_results?;

        let vector_scores: HashMap<String, &SearchResult> =
            vector_results.iter().map(|r| (r.id.clone(), r)).collect();
        let text_scores: HashMap<String, f32> = text_results.iter().map(|r| (r.id.clone(), r.score)).collect();

        // Candidates are the union of both engines' hits — a document
        // either engine surfaced is a fusion candidate, scored 0 on
        // whichever side didn't return it.
        let mut seen = std::collections::HashSet::new();
        let mut fused = Vec::new();
        for result in vector_results.iter().chain(text_results.iter()) {
            if !seen.insert(result.id.clone()) {
                continue;
            }
            let vector_score = vector_scores.get(&result.id).map(|r| r.score).unwrap_or(0.0);
            let text_score = text_scores.get(&result.id).copied().unwrap_or(0.0);
            let normalized_text = (text_score / self.config.bm25_normalization_factor).clamp(0.0, 1.0);
            let hybrid_score =
                self.config.vector_weight * vector_score + (1.0 - self.config.vector_weight) * normalized_text;

            fused.push(SearchResult {
                id: result.id.clone(),
                text: result.text.clone(),
                score: hybrid_score,
                created_at: result.created_at,
            });
        }

        if let Some(threshold) = options.threshold {
            fused.retain(|r| r.score >= threshold);
        }

        Ok(finalize_results(fused, options.num_results))
    }
}

#[async_trait]
impl SearchEngine for HybridSearchEngine {
    async fn search(
        &self,
        query: &SearchQuery,
        storage: &dyn StorageProvider,
        options: &SearchOptions,
        dimension: usize,
    ) -> VectorDbResult<Vec<SearchResult>> {
        match query {
            SearchQuery::Vector(_) => {
                self.vector_engine.search(query, storage, options, Some(dimension)).await
            }
            SearchQuery::Text(text) => self.search_text(text, storage, options, dimension).await,
        }
    }

    /// Forwarded only to the text engine: the vector side has no side
    /// index of its own to maintain (spec.md §4.4's "index maintenance").
    async fn index_document(&self, doc: &Document) -> VectorDbResult<()> {
        self.text_engine.index_document(doc).await
    }

    async fn remove_document(&self, id: &str) -> VectorDbResult<()> {
        self.text_engine.remove_document(id).await
    }
}
