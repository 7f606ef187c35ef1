//! # vectura
//!
//! An embeddable vector database: documents are text paired with a dense
//! embedding, inserted through an [`Embedder`](embedder::Embedder),
//! persisted through a [`StorageProvider`](storage::StorageProvider), and
//! retrieved by similarity through a
//! [`SearchEngine`](search::SearchEngine) — either brute-force in-memory,
//! indexed with batched candidate prefetch, or blended with an external
//! lexical engine.
//!
//! ## Architecture
//!
//! - `document`: the `Document` value object and its normalization invariant.
//! - `errors`: the crate-wide `VectorDbError` taxonomy.
//! - `vector_math`: normalization and batched cosine similarity.
//! - `config`: `DatabaseConfig`, `MemoryStrategy`, `SearchOptions`, `HybridConfig`.
//! - `embedder`: the `Embedder` trait plus `mock` and `ollama` implementations.
//! - `storage`: the `StorageProvider`/`IndexedStorageProvider` contract plus
//!   `memory` and `file` implementations.
//! - `search`: the `VectorSearchEngine` and the shared `SearchEngine` trait.
//! - `hybrid`: the `TextEngine` trait and `HybridSearchEngine` score fusion.
//! - `orchestrator`: `VecturaDb`, the public entry point tying the above
//!   together into the document lifecycle.

pub mod config;
pub mod document;
pub mod embedder;
pub mod errors;
pub mod hybrid;
pub mod orchestrator;
pub mod search;
pub mod storage;
pub mod vector_math;

pub use config::{DatabaseConfig, HybridConfig, MemoryStrategy, SearchOptions};
pub use document::Document;
pub use embedder::Embedder;
pub use errors::{VectorDbError, VectorDbResult};
pub use hybrid::{HybridSearchEngine, TextEngine};
pub use orchestrator::VecturaDb;
pub use search::{SearchEngine, SearchQuery, SearchResult, VectorSearchEngine};
pub use storage::{IndexedStorageProvider, StorageProvider};
