//! Vector normalization and batched cosine similarity.
//!
//! Grounded on `similarity_search.rs`'s cosine-similarity routine, widened
//! from a single query/target comparison into a dense matrix–vector
//! product over `rayon`, the same parallelism primitive the teacher uses
//! for its k-NN scan.

use rayon::prelude::*;

use crate::errors::{VectorDbError, VectorDbResult};

/// L2-normalize `v`. Fails with [`VectorDbError::InvalidInput`] if the norm
/// is zero or non-finite — spec.md §4.1.
pub fn normalize(v: &[f32]) -> VectorDbResult<Vec<f32>> {
    if !v.iter().all(|x| x.is_finite()) {
        return Err(VectorDbError::InvalidInput(
            "vector contains non-finite values".to_string(),
        ));
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(VectorDbError::InvalidInput("zero norm".to_string()));
    }
    Ok(v.iter().map(|x| x / norm).collect())
}

/// Compute `S = Matrix · Q` for a row-major `N×D` matrix of pre-normalized
/// document vectors and a normalized query `q` of length `D`. `S[i]` is the
/// cosine similarity of document `i` to the query (spec.md §4.1).
///
/// `matrix.len()` must equal `n * d`; this is an internal invariant, not a
/// caller-facing contract — a mismatch can only happen through a bug in the
/// caller, so it fails with `InvalidInput` rather than panicking.
pub fn batched_cosine(query: &[f32], matrix: &[f32], n: usize, d: usize) -> VectorDbResult<Vec<f32>> {
    if matrix.len() != n * d {
        return Err(VectorDbError::InvalidInput(format!(
            "matrix size {} does not match n*d = {}",
            matrix.len(),
            n * d
        )));
    }
    if query.len() != d {
        return Err(VectorDbError::DimensionMismatch {
            expected: d,
            got: query.len(),
        });
    }

    let scores = matrix
        .par_chunks(d)
        .map(|row| row.iter().zip(query.iter()).map(|(a, b)| a * b).sum::<f32>())
        .collect();

    Ok(scores)
}
