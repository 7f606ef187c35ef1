//! Benchmarks for the vector search engine across memory strategies.
//!
//! Replaces the teacher's `SimilaritySearch`/`ConcurrentSearchManager`
//! benchmarks (which no longer exist in this crate) with the equivalent
//! coverage over [`vectura::search::VectorSearchEngine`]: full in-memory
//! scan versus indexed candidate prefetch at a few corpus sizes.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;
use vectura::config::{MemoryStrategy, SearchOptions};
use vectura::document::Document;
use vectura::embedder::mock::MockEmbedder;
use vectura::search::{SearchQuery, VectorSearchEngine};
use vectura::storage::memory::InMemoryStorageProvider;
use vectura::storage::StorageProvider;
use vectura::vector_math::normalize;

const DIM: usize = 384;

fn generate_vector(seed: u32, dim: usize) -> Vec<f32> {
    let mut vector = Vec::with_capacity(dim);
    let mut x = seed as f32;
    for _ in 0..dim {
        x = ((x * 9301.0 + 49297.0) % 233280.0) / 233280.0;
        vector.push(x - 0.5);
    }
    normalize(&vector).unwrap()
}

async fn seeded_storage(count: usize) -> InMemoryStorageProvider {
    let storage = InMemoryStorageProvider::new();
    for i in 0..count {
        let doc = Document::new(format!("doc-{i}"), format!("benchmark document {i}"), generate_vector(i as u32 + 1, DIM))
            .unwrap();
        storage.save_document(doc).await.unwrap();
    }
    storage
}

fn bench_full_memory_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search_full_memory");

    for size in [100usize, 1_000, 10_000] {
        let storage = rt.block_on(seeded_storage(size));
        let engine = VectorSearchEngine::new(Arc::new(MockEmbedder::new(DIM)), MemoryStrategy::FullMemory);
        let query = SearchQuery::Vector(generate_vector(0, DIM));
        let options = SearchOptions::new(10, None).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(engine.search(black_box(&query), &storage, &options, Some(DIM)))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_indexed_search_fallback(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search_indexed_fallback");

    for size in [1_000usize, 10_000] {
        let storage = rt.block_on(seeded_storage(size));
        let engine = VectorSearchEngine::new(
            Arc::new(MockEmbedder::new(DIM)),
            MemoryStrategy::Indexed {
                candidate_multiplier: 4,
                batch_size: 256,
                max_concurrent_batches: 4,
            },
        );
        let query = SearchQuery::Vector(generate_vector(0, DIM));
        let options = SearchOptions::new(10, None).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(engine.search(black_box(&query), &storage, &options, Some(DIM)))
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_full_memory_search, bench_indexed_search_fallback);
criterion_main!(benches);
