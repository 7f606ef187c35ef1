//! The document value object.
//!
//! Grounded on `vector_db::types::EmbeddingEntry`: identity, a vector, a
//! creation timestamp, and a `validate()` pass run before anything is
//! persisted. Unlike the teacher's entry, a `Document` has no mutable
//! metadata — updates produce a new value with the same `id` and
//! `created_at`, per spec.md §3.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{VectorDbError, VectorDbResult};

/// A stored document: text plus its pre-normalized embedding.
///
/// Invariant: `embedding` is L2-normalized to within `1e-5` of unit length
/// for every document that has passed through [`Document::new`] or
/// [`Document::with_updated_text`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Tolerance for the `‖embedding‖₂ = 1` invariant (spec.md §3).
pub const NORM_TOLERANCE: f32 = 1e-5;

impl Document {
    /// Construct a fresh document with a new `created_at` timestamp.
    ///
    /// `embedding` must already be normalized by the caller (the
    /// orchestrator normalizes at write time, per spec.md §3's "computed
    /// exactly once" invariant) — this constructor only validates it.
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> VectorDbResult<Self> {
        let doc = Self {
            id: id.into(),
            text: text.into(),
            embedding,
            created_at: Utc::now(),
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Generate a fresh random id, the same shape the orchestrator uses
    /// when the caller doesn't supply one.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Produce a new document with the same `id` and `created_at`, but new
    /// text and embedding — the only mutation `update_document` ever
    /// performs (spec.md §3's lifecycle: "mutated only by `update`").
    pub fn with_updated_text(&self, text: impl Into<String>, embedding: Vec<f32>) -> VectorDbResult<Self> {
        let doc = Self {
            id: self.id.clone(),
            text: text.into(),
            embedding,
            created_at: self.created_at,
        };
        doc.validate()?;
        Ok(doc)
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    /// Check the embedding is finite and unit-norm within tolerance.
    /// Normalization itself happens in [`crate::vector_math::normalize`];
    /// this only guards the invariant at the value-object boundary.
    pub fn validate(&self) -> VectorDbResult<()> {
        if self.embedding.is_empty() {
            return Err(VectorDbError::InvalidInput(
                "embedding cannot be empty".to_string(),
            ));
        }
        if !self.embedding.iter().all(|v| v.is_finite()) {
            return Err(VectorDbError::InvalidInput(
                "embedding contains non-finite values".to_string(),
            ));
        }
        let norm = self.embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if (norm - 1.0).abs() > NORM_TOLERANCE {
            return Err(VectorDbError::InvalidInput(format!(
                "embedding is not unit-normalized: norm = {norm}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_accepts_unit_vector() {
        let doc = Document::new("id-1", "hello", vec![1.0, 0.0, 0.0]).unwrap();
        assert_eq!(doc.id, "id-1");
        assert_eq!(doc.dimension(), 3);
    }

    #[test]
    fn new_document_rejects_non_unit_vector() {
        let err = Document::new("id-1", "hello", vec![1.0, 1.0, 0.0]).unwrap_err();
        assert!(matches!(err, VectorDbError::InvalidInput(_)));
    }

    #[test]
    fn new_document_rejects_non_finite_vector() {
        let err = Document::new("id-1", "hello", vec![f32::NAN, 0.0]).unwrap_err();
        assert!(matches!(err, VectorDbError::InvalidInput(_)));
    }

    #[test]
    fn with_updated_text_preserves_id_and_created_at() {
        let doc = Document::new("id-1", "hello", vec![1.0, 0.0]).unwrap();
        let updated = doc.with_updated_text("world", vec![0.0, 1.0]).unwrap();
        assert_eq!(updated.id, doc.id);
        assert_eq!(updated.created_at, doc.created_at);
        assert_eq!(updated.text, "world");
    }

    #[test]
    fn generate_id_yields_distinct_values() {
        let a = Document::generate_id();
        let b = Document::generate_id();
        assert_ne!(a, b);
    }
}
