//! The storage contract: a basic capability every provider implements, and
//! an indexed capability providers may optionally expose.
//!
//! Grounded on `vector_db::storage::VectorStorage`'s CRUD surface,
//! generalized into a trait two backends (`file`, `memory`) implement.
//! Capability detection follows spec.md §9's guidance — "an object with an
//! optional sub-contract", not inheritance — via [`StorageProvider::as_indexed`].

pub mod file;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::document::Document;
use crate::errors::VectorDbResult;

/// Basic capability every storage provider implements (spec.md §4.2).
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn load_documents(&self) -> VectorDbResult<Vec<Document>>;

    /// Upsert a single document by id.
    async fn save_document(&self, doc: Document) -> VectorDbResult<()>;

    /// Upsert a batch of documents. Equivalent to per-document saves in any
    /// order, but MAY be optimized by the provider.
    async fn save_documents(&self, docs: Vec<Document>) -> VectorDbResult<()>;

    /// Idempotent: succeeds whether or not `id` existed.
    async fn delete_document(&self, id: &str) -> VectorDbResult<()>;

    /// Upsert preserving id — identical contract to `save_document`, kept
    /// as a distinct method because callers (the orchestrator's
    /// `update_document`) reach for it by name.
    async fn update_document(&self, doc: Document) -> VectorDbResult<()> {
        self.save_document(doc).await
    }

    /// Cheap; implementations MAY cache.
    async fn get_total_document_count(&self) -> VectorDbResult<usize>;

    /// Idempotent.
    async fn create_storage_directory_if_needed(&self) -> VectorDbResult<()>;

    /// Returns `Some(self)` if this provider also implements
    /// [`IndexedStorageProvider`]; `None` otherwise. The search engine uses
    /// this, not a downcast, to detect the capability at runtime
    /// (spec.md §4.2's "capability detection is observable at runtime").
    fn as_indexed(&self) -> Option<&dyn IndexedStorageProvider> {
        None
    }
}

/// Optional polymorphic extension (spec.md §4.2).
#[async_trait]
pub trait IndexedStorageProvider: StorageProvider {
    /// Paged load, in an implementation-defined but stable order.
    async fn load_documents_page(&self, offset: usize, limit: usize) -> VectorDbResult<Vec<Document>>;

    /// Partial result allowed: ids missing from the returned map are
    /// treated as not found, not as errors.
    async fn load_documents_by_ids(&self, ids: &[String]) -> VectorDbResult<HashMap<String, Document>>;

    /// `Ok(None)` means "no index available; fall back" (spec.md §4.3.2).
    /// `Ok(Some(vec![]))` means "index exists, no hits." If `Some`, ids are
    /// the top-`prefilter_size` candidates in descending
    /// approximate-similarity order.
    async fn search_vector_candidates(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        prefilter_size: usize,
    ) -> VectorDbResult<Option<Vec<String>>>;
}
