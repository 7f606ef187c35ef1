//! The vector search engine: strategy routing, in-memory exact search, and
//! indexed search with batched concurrent candidate loading (spec.md §4.3).

pub mod batch;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{MemoryStrategy, SearchOptions};
use crate::document::Document;
use crate::embedder::Embedder;
use crate::errors::{VectorDbError, VectorDbResult};
use crate::storage::StorageProvider;
use crate::vector_math::{batched_cosine, normalize};

/// A search query: either an already-embedded vector, or text the engine
/// must embed first (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SearchQuery {
    Vector(Vec<f32>),
    Text(String),
}

/// A single ranked search result (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Sort descending by score, tie-breaking ascending by id for determinism
/// (spec.md §9 Open Question (b)), then truncate to `num_results`.
pub(crate) fn finalize_results(mut results: Vec<SearchResult>, num_results: usize) -> Vec<SearchResult> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(num_results);
    results
}

fn documents_to_results(docs: &[Document], scores: &[f32]) -> Vec<SearchResult> {
    docs.iter()
        .zip(scores.iter())
        .map(|(doc, score)| SearchResult {
            id: doc.id.clone(),
            text: doc.text.clone(),
            score: *score,
            created_at: doc.created_at,
        })
        .collect()
}

/// Turn a set of documents into a dense row-major matrix, scored against
/// `query`, filtered by `threshold`, sorted, and truncated to
/// `num_results`. This is spec.md §4.3.1's core scoring step, reused by
/// both the full in-memory path and the indexed path's re-ranking of a
/// loaded candidate subset.
fn rank_documents(
    query: &[f32],
    docs: Vec<Document>,
    threshold: Option<f32>,
    num_results: usize,
) -> VectorDbResult<Vec<SearchResult>> {
    if docs.is_empty() {
        return Ok(Vec::new());
    }

    let dimension = query.len();
    for doc in &docs {
        if doc.dimension() != dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: dimension,
                got: doc.dimension(),
            });
        }
    }

    let matrix: Vec<f32> = docs.iter().flat_map(|d| d.embedding.iter().copied()).collect();
    let scores = batched_cosine(query, &matrix, docs.len(), dimension)?;

    let mut results = documents_to_results(&docs, &scores);
    if let Some(threshold) = threshold {
        results.retain(|r| r.score >= threshold);
    }

    Ok(finalize_results(results, num_results))
}

/// The orchestrator-facing search surface both [`VectorSearchEngine`] and
/// `hybrid::HybridSearchEngine` implement, so `VecturaDb` can hold either
/// behind one `Arc<dyn SearchEngine>` without knowing which it has
/// (spec.md §4.5 treats strategy selection as an orchestrator-level concern,
/// not something the engine needs to expose distinct types for).
#[async_trait::async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(
        &self,
        query: &SearchQuery,
        storage: &dyn StorageProvider,
        options: &SearchOptions,
        dimension: usize,
    ) -> VectorDbResult<Vec<SearchResult>>;

    /// Notify the engine a document was added, for engines with their own
    /// side index (the hybrid engine's lexical component). A pure vector
    /// engine holds no state beyond `storage` and ignores this.
    async fn index_document(&self, _doc: &Document) -> VectorDbResult<()> {
        Ok(())
    }

    /// Notify the engine a document was removed. See [`SearchEngine::index_document`].
    async fn remove_document(&self, _id: &str) -> VectorDbResult<()> {
        Ok(())
    }
}

/// Routes queries through the configured [`MemoryStrategy`], normalizes
/// vectors, and enforces top-K ordering (spec.md §4.3).
pub struct VectorSearchEngine {
    embedder: Arc<dyn Embedder>,
    strategy: MemoryStrategy,
}

impl VectorSearchEngine {
    pub fn new(embedder: Arc<dyn Embedder>, strategy: MemoryStrategy) -> Self {
        Self { embedder, strategy }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Resolve the query into a normalized vector, embedding text queries
    /// through the configured embedder (spec.md §4.3 step 1). The vector
    /// is validated against `dimension` only when the caller supplies one
    /// directly; an embedded query's dimension is whatever the embedder
    /// reports, and callers upstream (the orchestrator) are responsible
    /// for dimension-validating embedder output against the database's
    /// configured dimension.
    async fn resolve_query_vector(&self, query: &SearchQuery, dimension: Option<usize>) -> VectorDbResult<Vec<f32>> {
        let raw = match query {
            SearchQuery::Vector(v) => {
                if let Some(expected) = dimension {
                    if v.len() != expected {
                        return Err(VectorDbError::DimensionMismatch {
                            expected,
                            got: v.len(),
                        });
                    }
                }
                v.clone()
            }
            SearchQuery::Text(text) => self.embedder.embed(text).await?,
        };
        normalize(&raw)
    }

    /// Decide whether to use the indexed path (spec.md §4.3 step 2).
    async fn should_use_indexed(&self, storage: &dyn StorageProvider) -> VectorDbResult<bool> {
        let use_indexed = match &self.strategy {
            MemoryStrategy::FullMemory => false,
            MemoryStrategy::Indexed { .. } => true,
            MemoryStrategy::Automatic { threshold, .. } => {
                storage.get_total_document_count().await? >= *threshold
            }
        };
        log::debug!(
            "strategy {:?} selected {} path",
            self.strategy,
            if use_indexed { "indexed" } else { "in-memory" }
        );
        Ok(use_indexed)
    }

    fn indexed_params(&self) -> Option<(usize, usize, usize)> {
        match &self.strategy {
            MemoryStrategy::FullMemory => None,
            MemoryStrategy::Indexed {
                candidate_multiplier,
                batch_size,
                max_concurrent_batches,
            } => Some((*candidate_multiplier, *batch_size, *max_concurrent_batches)),
            MemoryStrategy::Automatic {
                candidate_multiplier,
                batch_size,
                max_concurrent_batches,
                ..
            } => Some((*candidate_multiplier, *batch_size, *max_concurrent_batches)),
        }
    }

    /// Run a search against `storage` with the given query and options
    /// (spec.md §4.3). `dimension` validates a supplied `Vector` query;
    /// pass `None` to skip that check (the orchestrator already validates
    /// at its own boundary before calling in).
    pub async fn search(
        &self,
        query: &SearchQuery,
        storage: &dyn StorageProvider,
        options: &SearchOptions,
        dimension: Option<usize>,
    ) -> VectorDbResult<Vec<SearchResult>> {
        let query_vector = self.resolve_query_vector(query, dimension).await?;

        let use_indexed = self.should_use_indexed(storage).await?;

        if use_indexed {
            if let Some(indexed) = storage.as_indexed() {
                let (candidate_multiplier, batch_size, max_concurrent_batches) = self
                    .indexed_params()
                    .expect("indexed path implies an indexed strategy");
                return self
                    .search_indexed(
                        &query_vector,
                        indexed,
                        options,
                        candidate_multiplier,
                        batch_size,
                        max_concurrent_batches,
                    )
                    .await;
            }
        }

        self.search_in_memory(&query_vector, storage, options.threshold, options.num_results)
            .await
    }

    /// §4.3.1: load everything, score, filter, sort, truncate.
    async fn search_in_memory(
        &self,
        query: &[f32],
        storage: &dyn StorageProvider,
        threshold: Option<f32>,
        num_results: usize,
    ) -> VectorDbResult<Vec<SearchResult>> {
        let docs = storage.load_documents().await?;
        rank_documents(query, docs, threshold, num_results)
    }

    /// §4.3.2: candidate prefetch (or fallback) then exact re-rank.
    #[allow(clippy::too_many_arguments)]
    async fn search_indexed(
        &self,
        query: &[f32],
        storage: &dyn crate::storage::IndexedStorageProvider,
        options: &SearchOptions,
        candidate_multiplier: usize,
        batch_size: usize,
        max_concurrent_batches: usize,
    ) -> VectorDbResult<Vec<SearchResult>> {
        let prefilter_size = options.num_results.saturating_mul(candidate_multiplier);

        let candidate_ids = match storage
            .search_vector_candidates(query, options.num_results, prefilter_size)
            .await?
        {
            Some(ids) => ids,
            None => {
                // Fall back: brute-force rank raised to prefilter_size with
                // no threshold, then re-rank those candidates below.
                let fallback = self
                    .search_in_memory(query, storage, None, prefilter_size)
                    .await?;
                fallback.into_iter().map(|r| r.id).collect()
            }
        };

        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let loaded = batch::load_candidates_batched(storage, &candidate_ids, batch_size, max_concurrent_batches)
            .await?;

        let docs: Vec<Document> = candidate_ids
            .iter()
            .filter_map(|id| loaded.get(id).cloned())
            .collect();

        rank_documents(query, docs, options.threshold, options.num_results)
    }
}

#[async_trait::async_trait]
impl SearchEngine for VectorSearchEngine {
    async fn search(
        &self,
        query: &SearchQuery,
        storage: &dyn StorageProvider,
        options: &SearchOptions,
        dimension: usize,
    ) -> VectorDbResult<Vec<SearchResult>> {
        VectorSearchEngine::search(self, query, storage, options, Some(dimension)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStrategy;
    use crate::embedder::mock::MockEmbedder;
    use crate::storage::memory::InMemoryStorageProvider;
    use crate::storage::StorageProvider;

    async fn seeded_storage(vectors: &[(&str, Vec<f32>)]) -> InMemoryStorageProvider {
        let storage = InMemoryStorageProvider::new();
        for (id, vector) in vectors {
            let normalized = normalize(vector).unwrap();
            let doc = Document::new(*id, format!("text for {id}"), normalized).unwrap();
            storage.save_document(doc).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn full_memory_search_ranks_by_cosine() {
        let storage = seeded_storage(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
            ("c", vec![0.9, 0.1]),
        ])
        .await;
        let engine = VectorSearchEngine::new(Arc::new(MockEmbedder::new(2)), MemoryStrategy::FullMemory);
        let options = SearchOptions::new(2, None).unwrap();
        let results = engine
            .search(&SearchQuery::Vector(vec![1.0, 0.0]), &storage, &options, Some(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
    }

    #[tokio::test]
    async fn threshold_filters_out_dissimilar_documents() {
        let storage = seeded_storage(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.8, 0.6]),
            ("c", vec![0.0, 1.0]),
        ])
        .await;
        let engine = VectorSearchEngine::new(Arc::new(MockEmbedder::new(2)), MemoryStrategy::FullMemory);
        let options = SearchOptions::new(10, Some(0.9)).unwrap();
        let results = engine
            .search(&SearchQuery::Vector(vec![1.0, 0.0]), &storage, &options, Some(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn results_are_sorted_and_truncated() {
        let storage = seeded_storage(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
            ("c", vec![0.9, 0.1]),
            ("d", vec![0.7, 0.3]),
        ])
        .await;
        let engine = VectorSearchEngine::new(Arc::new(MockEmbedder::new(2)), MemoryStrategy::FullMemory);
        let options = SearchOptions::new(2, None).unwrap();
        let results = engine
            .search(&SearchQuery::Vector(vec![1.0, 0.0]), &storage, &options, Some(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let storage = seeded_storage(&[("a", vec![1.0, 0.0])]).await;
        let engine = VectorSearchEngine::new(Arc::new(MockEmbedder::new(2)), MemoryStrategy::FullMemory);
        let options = SearchOptions::new(1, None).unwrap();
        let err = engine
            .search(&SearchQuery::Vector(vec![1.0, 0.0, 0.0]), &storage, &options, Some(2))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDbError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn automatic_strategy_uses_full_memory_below_threshold() {
        let storage = seeded_storage(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]).await;
        let engine = VectorSearchEngine::new(
            Arc::new(MockEmbedder::new(2)),
            MemoryStrategy::Automatic {
                threshold: 100,
                candidate_multiplier: 2,
                batch_size: 10,
                max_concurrent_batches: 1,
            },
        );
        let options = SearchOptions::new(1, None).unwrap();
        let results = engine
            .search(&SearchQuery::Vector(vec![1.0, 0.0]), &storage, &options, Some(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
    }

    #[tokio::test]
    async fn empty_storage_returns_empty_results() {
        let storage = InMemoryStorageProvider::new();
        let engine = VectorSearchEngine::new(Arc::new(MockEmbedder::new(2)), MemoryStrategy::FullMemory);
        let options = SearchOptions::new(5, None).unwrap();
        let results = engine
            .search(&SearchQuery::Vector(vec![1.0, 0.0]), &storage, &options, Some(2))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    /// A storage wrapper that always reports a fixed candidate list from
    /// `search_vector_candidates`, to exercise the indexed path
    /// (spec.md §8 scenario 4) without needing a real ANN index.
    struct FakeIndexedStorage {
        inner: InMemoryStorageProvider,
        candidates: Vec<String>,
        full_load_calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl StorageProvider for FakeIndexedStorage {
        async fn load_documents(&self) -> VectorDbResult<Vec<Document>> {
            self.full_load_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.load_documents().await
        }
        async fn save_document(&self, doc: Document) -> VectorDbResult<()> {
            self.inner.save_document(doc).await
        }
        async fn save_documents(&self, docs: Vec<Document>) -> VectorDbResult<()> {
            self.inner.save_documents(docs).await
        }
        async fn delete_document(&self, id: &str) -> VectorDbResult<()> {
            self.inner.delete_document(id).await
        }
        async fn get_total_document_count(&self) -> VectorDbResult<usize> {
            self.inner.get_total_document_count().await
        }
        async fn create_storage_directory_if_needed(&self) -> VectorDbResult<()> {
            self.inner.create_storage_directory_if_needed().await
        }
        fn as_indexed(&self) -> Option<&dyn crate::storage::IndexedStorageProvider> {
            Some(self)
        }
    }

    #[async_trait::async_trait]
    impl crate::storage::IndexedStorageProvider for FakeIndexedStorage {
        async fn load_documents_page(&self, offset: usize, limit: usize) -> VectorDbResult<Vec<Document>> {
            self.inner.as_indexed().unwrap().load_documents_page(offset, limit).await
        }
        async fn load_documents_by_ids(
            &self,
            ids: &[String],
        ) -> VectorDbResult<std::collections::HashMap<String, Document>> {
            self.inner.as_indexed().unwrap().load_documents_by_ids(ids).await
        }
        async fn search_vector_candidates(
            &self,
            _query_embedding: &[f32],
            _top_k: usize,
            _prefilter_size: usize,
        ) -> VectorDbResult<Option<Vec<String>>> {
            Ok(Some(self.candidates.clone()))
        }
    }

    #[tokio::test]
    async fn indexed_candidate_path_skips_full_load() {
        let inner = seeded_storage(&[
            ("d1", vec![0.0, 1.0]),
            ("d2", vec![1.0, 0.0]),
        ])
        .await;
        let storage = FakeIndexedStorage {
            inner,
            candidates: vec!["d2".to_string()],
            full_load_calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let engine = VectorSearchEngine::new(
            Arc::new(MockEmbedder::new(2)),
            MemoryStrategy::Indexed {
                candidate_multiplier: 2,
                batch_size: 10,
                max_concurrent_batches: 1,
            },
        );
        let options = SearchOptions::new(1, None).unwrap();
        let results = engine
            .search(&SearchQuery::Vector(vec![1.0, 0.0]), &storage, &options, Some(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "d2");
        assert_eq!(storage.full_load_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn indexed_fallback_invokes_full_load() {
        let inner = seeded_storage(&[
            ("d1", vec![0.0, 1.0]),
            ("d2", vec![1.0, 0.0]),
            ("d3", vec![0.9, 0.1]),
        ])
        .await;
        let storage = InMemoryStorageProvider::new();
        for doc in inner.load_documents().await.unwrap() {
            storage.save_document(doc).await.unwrap();
        }
        let engine = VectorSearchEngine::new(
            Arc::new(MockEmbedder::new(2)),
            MemoryStrategy::Indexed {
                candidate_multiplier: 2,
                batch_size: 10,
                max_concurrent_batches: 1,
            },
        );
        let options = SearchOptions::new(1, None).unwrap();
        // InMemoryStorageProvider::search_vector_candidates always returns
        // None, so this exercises the fallback arm of §4.3.2.
        let results = engine
            .search(&SearchQuery::Vector(vec![1.0, 0.0]), &storage, &options, Some(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "d2");
    }
}
