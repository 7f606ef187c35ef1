//! Batched concurrent candidate loading (spec.md §4.3.3).
//!
//! Grounded on `similarity_search.rs`'s use of `tokio::sync::Semaphore` to
//! bound concurrent work, generalized from bounding similarity computation
//! to bounding concurrent `load_documents_by_ids` calls: ids are
//! partitioned into chunks of `batch_size`, chunks are processed in rounds
//! of up to `max_concurrent_batches` concurrent futures, and round `N+1`
//! never starts before every future in round `N` (even the failed ones)
//! has resolved. Per spec.md §9's design note, a structured-concurrency
//! scope with a bounded `join_all` per round satisfies this contract — no
//! task spawning is required.

use std::collections::HashMap;

use crate::document::Document;
use crate::errors::{VectorDbError, VectorDbResult};
use crate::storage::IndexedStorageProvider;

/// Load `ids` from `storage` in batches of at most `batch_size`, running at
/// most `max_concurrent_batches` batches concurrently.
///
/// Per-batch failures are absorbed as long as at least one batch succeeds;
/// only total failure (every batch failed, nothing loaded) raises
/// [`VectorDbError::LoadFailed`].
pub async fn load_candidates_batched(
    storage: &dyn IndexedStorageProvider,
    ids: &[String],
    batch_size: usize,
    max_concurrent_batches: usize,
) -> VectorDbResult<HashMap<String, Document>> {
    if ids.len() <= batch_size {
        return storage.load_documents_by_ids(ids).await;
    }

    let chunks: Vec<&[String]> = ids.chunks(batch_size.max(1)).collect();

    let mut all_documents: HashMap<String, Document> = HashMap::new();
    let mut failed_batches = 0usize;

    for round in chunks.chunks(max_concurrent_batches.max(1)) {
        let futures = round.iter().map(|chunk| storage.load_documents_by_ids(chunk));

        // Wait for every future in this round before starting the next,
        // even the ones that failed.
        let results = futures::future::join_all(futures).await;

        for result in results {
            match result {
                Ok(batch) => {
                    // Later wins on key collisions — collisions shouldn't
                    // occur across disjoint id chunks, but the policy must
                    // be defined (spec.md §4.3.3).
                    all_documents.extend(batch);
                }
                Err(e) => {
                    log::warn!("candidate batch load failed: {e}");
                    failed_batches += 1;
                }
            }
        }
    }

    if all_documents.is_empty() && failed_batches > 0 {
        return Err(VectorDbError::LoadFailed(format!(
            "Failed to load any candidate documents ({failed_batches} batch(es) failed)"
        )));
    }

    Ok(all_documents)
}
