//! `VecturaDb`: the public entry point wiring configuration, storage, a
//! search engine, and an embedder into the document lifecycle (spec.md
//! §4.5).
//!
//! Grounded on `vector_db::operations::VectorOperations`'s CRUD surface and
//! the teacher's actor-style mutation serialization, generalized here to a
//! `tokio::sync::Mutex<()>` write lock held across each mutating call
//! (spec.md §5's "actor-like serialization... the mechanism is free").

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{DatabaseConfig, SearchOptions};
use crate::document::Document;
use crate::embedder::Embedder;
use crate::errors::{VectorDbError, VectorDbResult};
use crate::search::{SearchEngine, SearchQuery, SearchResult};
use crate::storage::StorageProvider;

/// Reject ids that would escape the file storage provider's
/// `<root>/<database-name>/<id>.json` layout (spec.md §6) if a caller
/// supplies one directly, rather than letting a path-traversal id reach
/// the filesystem.
fn validate_id(id: &str) -> VectorDbResult<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) || id.contains('\0') {
        return Err(VectorDbError::InvalidInput(format!(
            "invalid document id: {id:?}"
        )));
    }
    Ok(())
}

/// The embeddable vector database (spec.md §2). Holds no document state
/// itself — `storage` and `search_engine` own that — only the
/// configuration and the single-writer lock serializing mutations.
pub struct VecturaDb {
    config: DatabaseConfig,
    storage: Arc<dyn StorageProvider>,
    search_engine: Arc<dyn SearchEngine>,
    embedder: Arc<dyn Embedder>,
    dimension: usize,
    /// Serializes `add`/`update`/`delete`/`reset`: at most one mutation in
    /// flight at a time (spec.md §5). Searches never take this lock.
    write_lock: Mutex<()>,
}

impl VecturaDb {
    /// `dimension` is the database's configured embedding dimension —
    /// either `config.dimension` if set, or probed from `embedder` if not.
    pub async fn new(
        config: DatabaseConfig,
        storage: Arc<dyn StorageProvider>,
        search_engine: Arc<dyn SearchEngine>,
        embedder: Arc<dyn Embedder>,
    ) -> VectorDbResult<Self> {
        config.validate()?;
        storage.create_storage_directory_if_needed().await?;
        let dimension = match config.dimension {
            Some(dim) => dim,
            None => embedder.dimension().await?,
        };
        Ok(Self {
            config,
            storage,
            search_engine,
            embedder,
            dimension,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Convenience over [`VecturaDb::add_documents`] for a single document.
    pub async fn add_document(&self, text: impl Into<String>, id: Option<String>) -> VectorDbResult<String> {
        let ids = self
            .add_documents(vec![text.into()], id.map(|i| vec![i]))
            .await?;
        Ok(ids.into_iter().next().expect("add_documents returns one id per text"))
    }

    /// spec.md §4.5's `addDocuments`.
    pub async fn add_documents(
        &self,
        texts: Vec<String>,
        ids: Option<Vec<String>>,
    ) -> VectorDbResult<Vec<String>> {
        if texts.is_empty() {
            return Err(VectorDbError::InvalidInput(
                "texts must be non-empty".to_string(),
            ));
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(VectorDbError::InvalidInput(
                "every text must contain at least one non-whitespace character".to_string(),
            ));
        }
        if let Some(ids) = &ids {
            if ids.len() != texts.len() {
                return Err(VectorDbError::InvalidInput(format!(
                    "got {} ids for {} texts",
                    ids.len(),
                    texts.len()
                )));
            }
            for id in ids {
                validate_id(id)?;
            }
        }

        let _guard = self.write_lock.lock().await;

        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(VectorDbError::InvalidInput(format!(
                "Embedder returned {} for {}",
                embeddings.len(),
                texts.len()
            )));
        }

        let resolved_ids: Vec<String> = match ids {
            Some(ids) => ids,
            None => (0..texts.len()).map(|_| Document::generate_id()).collect(),
        };

        let mut documents = Vec::with_capacity(texts.len());
        for ((id, text), embedding) in resolved_ids.iter().cloned().zip(texts).zip(embeddings) {
            if embedding.len() != self.dimension {
                return Err(VectorDbError::DimensionMismatch {
                    expected: self.dimension,
                    got: embedding.len(),
                });
            }
            let normalized = crate::vector_math::normalize(&embedding)?;
            documents.push(Document::new(id, text, normalized)?);
        }

        self.storage.save_documents(documents.clone()).await?;
        for doc in &documents {
            self.search_engine.index_document(doc).await?;
        }

        log::debug!(
            "added {} document(s), {} now in storage",
            documents.len(),
            self.storage.get_total_document_count().await?
        );

        Ok(resolved_ids)
    }

    /// spec.md §4.5's `search`. Options default from `config` when omitted.
    pub async fn search(
        &self,
        query: SearchQuery,
        num_results: Option<usize>,
        threshold: Option<f32>,
    ) -> VectorDbResult<Vec<SearchResult>> {
        if let SearchQuery::Vector(v) = &query {
            if v.len() != self.dimension {
                return Err(VectorDbError::DimensionMismatch {
                    expected: self.dimension,
                    got: v.len(),
                });
            }
        }

        let options = SearchOptions::new(
            num_results.unwrap_or(self.config.default_num_results),
            threshold.or(self.config.min_threshold),
        )?;

        self.search_engine
            .search(&query, self.storage.as_ref(), &options, self.dimension)
            .await
    }

    /// spec.md §4.5's `updateDocument`: replace text and embedding,
    /// preserving `id` and `created_at`.
    pub async fn update_document(&self, id: &str, new_text: impl Into<String>) -> VectorDbResult<()> {
        let _guard = self.write_lock.lock().await;

        let new_text = new_text.into();
        let existing = self.load_single_document(id).await?;
        let Some(existing) = existing else {
            return Err(VectorDbError::DocumentNotFound(id.to_string()));
        };

        let embedding = self.embedder.embed(&new_text).await?;
        if embedding.len() != self.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: self.dimension,
                got: embedding.len(),
            });
        }
        let normalized = crate::vector_math::normalize(&embedding)?;
        let updated = existing.with_updated_text(new_text, normalized)?;

        self.storage.update_document(updated.clone()).await?;
        self.search_engine.remove_document(id).await?;
        self.search_engine.index_document(&updated).await?;
        log::debug!("updated document {id}");
        Ok(())
    }

    /// Preferring indexed point lookup, falling back to a full load
    /// filtered down to `id` (spec.md §4.5).
    async fn load_single_document(&self, id: &str) -> VectorDbResult<Option<Document>> {
        if let Some(indexed) = self.storage.as_indexed() {
            let map = indexed.load_documents_by_ids(&[id.to_string()]).await?;
            return Ok(map.into_iter().next().map(|(_, doc)| doc));
        }
        let docs = self.storage.load_documents().await?;
        Ok(docs.into_iter().find(|d| d.id == id))
    }

    /// spec.md §4.5's `deleteDocuments`: idempotent per id.
    pub async fn delete_documents(&self, ids: &[String]) -> VectorDbResult<()> {
        let _guard = self.write_lock.lock().await;
        self.delete_documents_locked(ids).await
    }

    /// The actual delete work, assuming `write_lock` is already held by the
    /// caller. Shared by [`VecturaDb::delete_documents`] and
    /// [`VecturaDb::reset`] so `reset` can snapshot ids and delete them
    /// under a single, uninterrupted hold of the lock (spec.md §5: at most
    /// one mutation in flight at a time across *all* mutating calls).
    async fn delete_documents_locked(&self, ids: &[String]) -> VectorDbResult<()> {
        for id in ids {
            self.storage.delete_document(id).await?;
            self.search_engine.remove_document(id).await?;
        }
        log::debug!(
            "deleted {} document(s), {} remain in storage",
            ids.len(),
            self.storage.get_total_document_count().await?
        );
        Ok(())
    }

    /// spec.md §4.5's `reset`: delete every currently-stored document.
    ///
    /// Holds `write_lock` across both the id snapshot and the delete so a
    /// concurrent `add_documents` can't land a new document in the gap
    /// between them and survive the reset.
    pub async fn reset(&self) -> VectorDbResult<()> {
        let _guard = self.write_lock.lock().await;
        let ids: Vec<String> = self
            .storage
            .load_documents()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();
        log::debug!("resetting database, dropping {} document(s)", ids.len());
        self.delete_documents_locked(&ids).await
    }

    pub async fn document_count(&self) -> VectorDbResult<usize> {
        let count = self.storage.get_total_document_count().await?;
        log::debug!("document_count = {count}");
        Ok(count)
    }

    pub async fn get_all_documents(&self) -> VectorDbResult<Vec<Document>> {
        self.storage.load_documents().await
    }
}
