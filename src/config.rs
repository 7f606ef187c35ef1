//! Configuration types: `DatabaseConfig`, `MemoryStrategy`, `SearchOptions`.
//!
//! Grounded on `vector_db::types::VectorStorageConfig`: a serde-derived
//! config struct with a `Default` impl and an explicit validation pass,
//! rather than validating ad hoc at each call site.

use serde::{Deserialize, Serialize};

use crate::errors::{VectorDbError, VectorDbResult};

/// Strategy the vector search engine uses to decide between brute-force
/// and indexed candidate prefetch (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MemoryStrategy {
    /// Always score every document in memory.
    FullMemory,
    /// Always delegate candidate generation to indexed storage.
    Indexed {
        candidate_multiplier: usize,
        batch_size: usize,
        max_concurrent_batches: usize,
    },
    /// Use the indexed path once the storage's document count reaches
    /// `threshold`, full-memory below it.
    Automatic {
        threshold: usize,
        candidate_multiplier: usize,
        batch_size: usize,
        max_concurrent_batches: usize,
    },
}

impl Default for MemoryStrategy {
    fn default() -> Self {
        // Implementation-chosen defaults, per spec.md §6.
        MemoryStrategy::Automatic {
            threshold: 10_000,
            candidate_multiplier: 4,
            batch_size: 256,
            max_concurrent_batches: 4,
        }
    }
}

impl MemoryStrategy {
    /// Validate the strategy's numeric constraints (spec.md §3).
    pub fn validate(&self) -> VectorDbResult<()> {
        match self {
            MemoryStrategy::FullMemory => Ok(()),
            MemoryStrategy::Indexed {
                candidate_multiplier,
                batch_size,
                max_concurrent_batches,
            } => validate_indexed_params(*candidate_multiplier, *batch_size, *max_concurrent_batches),
            MemoryStrategy::Automatic {
                candidate_multiplier,
                batch_size,
                max_concurrent_batches,
                ..
            } => validate_indexed_params(*candidate_multiplier, *batch_size, *max_concurrent_batches),
        }
    }
}

fn validate_indexed_params(
    candidate_multiplier: usize,
    batch_size: usize,
    max_concurrent_batches: usize,
) -> VectorDbResult<()> {
    if candidate_multiplier < 1 {
        return Err(VectorDbError::InvalidInput(
            "candidate_multiplier must be >= 1".to_string(),
        ));
    }
    if batch_size < 1 {
        return Err(VectorDbError::InvalidInput(
            "batch_size must be >= 1".to_string(),
        ));
    }
    if max_concurrent_batches < 1 {
        return Err(VectorDbError::InvalidInput(
            "max_concurrent_batches must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Per-call search options (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOptions {
    pub num_results: usize,
    pub threshold: Option<f32>,
}

impl SearchOptions {
    pub fn new(num_results: usize, threshold: Option<f32>) -> VectorDbResult<Self> {
        if num_results == 0 {
            return Err(VectorDbError::InvalidInput(
                "num_results must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            num_results,
            threshold,
        })
    }
}

/// BM25 tuning knobs, opaque to the core (spec.md §6) — forwarded to the
/// lexical engine, and `bm25_normalization_factor` used by the hybrid
/// combiner (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HybridConfig {
    pub vector_weight: f32,
    pub bm25_normalization_factor: f32,
    pub k1: f32,
    pub b: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.5,
            bm25_normalization_factor: 10.0,
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl HybridConfig {
    /// Clamp `vector_weight` to `[0, 1]` and `bm25_normalization_factor` to
    /// `[1e-9, ∞)`, per spec.md §4.4's construction rule. Clamping (not
    /// rejecting) matches the teacher's tolerant-config philosophy of
    /// normalizing out-of-range values rather than failing construction.
    pub fn new(vector_weight: f32, bm25_normalization_factor: f32, k1: f32, b: f32) -> Self {
        Self {
            vector_weight: vector_weight.clamp(0.0, 1.0),
            bm25_normalization_factor: bm25_normalization_factor.max(1e-9),
            k1,
            b,
        }
    }
}

/// Top-level database configuration (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database subdirectory name (required, non-empty).
    pub name: String,
    /// Optional root directory override; defaults to the user documents
    /// directory under `VecturaKit/<name>/` when absent.
    pub directory_url: Option<String>,
    /// Optional override of the embedder's reported dimension.
    pub dimension: Option<usize>,
    pub memory_strategy: MemoryStrategy,
    pub default_num_results: usize,
    pub min_threshold: Option<f32>,
    pub hybrid: HybridConfig,
}

impl DatabaseConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory_url: None,
            dimension: None,
            memory_strategy: MemoryStrategy::default(),
            default_num_results: 10,
            min_threshold: None,
            hybrid: HybridConfig::default(),
        }
    }

    pub fn validate(&self) -> VectorDbResult<()> {
        if self.name.trim().is_empty() {
            return Err(VectorDbError::InvalidInput(
                "database name must be non-empty".to_string(),
            ));
        }
        if self.default_num_results == 0 {
            return Err(VectorDbError::InvalidInput(
                "default_num_results must be >= 1".to_string(),
            ));
        }
        if let Some(dim) = self.dimension {
            if dim == 0 {
                return Err(VectorDbError::InvalidInput(
                    "dimension override must be >= 1".to_string(),
                ));
            }
        }
        self.memory_strategy.validate()
    }

    /// Resolve the on-disk storage directory, per spec.md §6: the
    /// configured root if present, otherwise the user documents directory
    /// under `VecturaKit/<name>/`.
    pub fn resolve_storage_dir(&self) -> std::path::PathBuf {
        let root = self
            .directory_url
            .as_ref()
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| {
                dirs::document_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join("VecturaKit")
            });
        root.join(&self.name)
    }
}
