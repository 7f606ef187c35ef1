//! An in-memory storage provider, for tests and transient use (spec.md §2).
//!
//! Grounded on the teacher's in-memory `HashMap`-backed test fixtures
//! throughout `vector_db/mod.rs`'s test module.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::Document;
use crate::errors::VectorDbResult;

use super::{IndexedStorageProvider, StorageProvider};

#[derive(Debug, Default, Clone)]
pub struct InMemoryStorageProvider {
    documents: Arc<RwLock<HashMap<String, Document>>>,
}

impl InMemoryStorageProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageProvider for InMemoryStorageProvider {
    async fn load_documents(&self) -> VectorDbResult<Vec<Document>> {
        Ok(self.documents.read().await.values().cloned().collect())
    }

    async fn save_document(&self, doc: Document) -> VectorDbResult<()> {
        self.documents.write().await.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn save_documents(&self, docs: Vec<Document>) -> VectorDbResult<()> {
        let mut guard = self.documents.write().await;
        for doc in docs {
            guard.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> VectorDbResult<()> {
        self.documents.write().await.remove(id);
        Ok(())
    }

    async fn get_total_document_count(&self) -> VectorDbResult<usize> {
        Ok(self.documents.read().await.len())
    }

    async fn create_storage_directory_if_needed(&self) -> VectorDbResult<()> {
        Ok(())
    }

    fn as_indexed(&self) -> Option<&dyn IndexedStorageProvider> {
        Some(self)
    }
}

#[async_trait]
impl IndexedStorageProvider for InMemoryStorageProvider {
    async fn load_documents_page(&self, offset: usize, limit: usize) -> VectorDbResult<Vec<Document>> {
        let guard = self.documents.read().await;
        let mut ids: Vec<&String> = guard.keys().collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| guard.get(id).cloned())
            .collect())
    }

    async fn load_documents_by_ids(&self, ids: &[String]) -> VectorDbResult<HashMap<String, Document>> {
        let guard = self.documents.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| guard.get(id).map(|doc| (id.clone(), doc.clone())))
            .collect())
    }

    /// No index backing a plain in-memory map: always falls back
    /// (spec.md §4.3.2).
    async fn search_vector_candidates(
        &self,
        _query_embedding: &[f32],
        _top_k: usize,
        _prefilter_size: usize,
    ) -> VectorDbResult<Option<Vec<String>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document::new(id, "text", vec![1.0, 0.0]).unwrap()
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let storage = InMemoryStorageProvider::new();
        storage.save_document(doc("a")).await.unwrap();
        let docs = storage.load_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let storage = InMemoryStorageProvider::new();
        storage.delete_document("missing").await.unwrap();
        storage.save_document(doc("a")).await.unwrap();
        storage.delete_document("a").await.unwrap();
        storage.delete_document("a").await.unwrap();
        assert_eq!(storage.get_total_document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn save_documents_upserts_by_id() {
        let storage = InMemoryStorageProvider::new();
        storage.save_document(doc("a")).await.unwrap();
        let updated = Document::new("a", "new text", vec![0.0, 1.0]).unwrap();
        storage.save_documents(vec![updated]).await.unwrap();
        let docs = storage.load_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "new text");
    }

    #[tokio::test]
    async fn indexed_capability_is_exposed() {
        let storage = InMemoryStorageProvider::new();
        assert!(storage.as_indexed().is_some());
    }

    #[tokio::test]
    async fn paged_load_is_stable_and_slices() {
        let storage = InMemoryStorageProvider::new();
        for id in ["a", "b", "c"] {
            storage.save_document(doc(id)).await.unwrap();
        }
        let indexed = storage.as_indexed().unwrap();
        let page = indexed.load_documents_page(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "b");
    }

    #[tokio::test]
    async fn load_by_ids_allows_partial_results() {
        let storage = InMemoryStorageProvider::new();
        storage.save_document(doc("a")).await.unwrap();
        let indexed = storage.as_indexed().unwrap();
        let map = indexed
            .load_documents_by_ids(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("a"));
    }

    #[tokio::test]
    async fn search_vector_candidates_always_falls_back() {
        let storage = InMemoryStorageProvider::new();
        let indexed = storage.as_indexed().unwrap();
        let result = indexed.search_vector_candidates(&[1.0, 0.0], 5, 10).await.unwrap();
        assert!(result.is_none());
    }
}
