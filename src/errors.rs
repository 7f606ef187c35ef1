//! Error taxonomy for the vector database.
//!
//! One enum, `VectorDbError`, covers every public operation in the crate —
//! validation failures, dimension mismatches, missing documents, and
//! storage I/O failures. Matches the teacher's one-enum-per-subsystem
//! convention (`vector_db::types::VectorDbError`).

use thiserror::Error;

/// Errors produced by any public operation of this crate.
#[derive(Error, Debug)]
pub enum VectorDbError {
    /// A caller-supplied argument failed validation: empty batches,
    /// whitespace-only text, mismatched id/text counts, an embedder that
    /// returned the wrong count, a zero-norm or non-finite vector, or a
    /// malformed option.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A vector's length did not match the database's configured
    /// dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// `update_document` was called with an id that does not exist.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// Storage I/O failed in a way that could not be partially absorbed —
    /// in particular, the batched candidate loader (§4.3.3) raises this
    /// only when *every* batch failed.
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// Opaque wrapper for storage-provider-specific failures (e.g. a
    /// filesystem error from the file storage provider).
    #[error("storage error: {0}")]
    Storage(String),
}

pub type VectorDbResult<T> = Result<T, VectorDbError>;

impl From<std::io::Error> for VectorDbError {
    fn from(err: std::io::Error) -> Self {
        VectorDbError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for VectorDbError {
    fn from(err: serde_json::Error) -> Self {
        VectorDbError::Storage(format!("serialization error: {err}"))
    }
}
