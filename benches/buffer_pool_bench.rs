use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use std::sync::Arc;

use loondb::storage::buffer::BufferPoolManager;

// Create temporary db for benching
fn create_bench_buffer_pool(pool_size: usize) -> Arc<BufferPoolManager> {
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    // Keep the temp file alive
    std::mem::forget(temp_file);

    Arc::new(BufferPoolManager::new(pool_size, path).unwrap())
}

fn buffer_pool_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BufferPool");

    for size in [16, 64, 256].iter() {
        group.bench_with_input(
            BenchmarkId::new("sequential_access", size),
            size,
            |b, &size| {
                let pool = create_bench_buffer_pool(size);
                let mut page_ids = Vec::new();
                for _ in 0..size * 2 {
                    let (_, page_id) = pool.new_page().unwrap();
                    pool.unpin_page(page_id, true);
                    page_ids.push(page_id);
                }

                b.iter(|| {
                    for &page_id in &page_ids {
                        let _page = pool.fetch_page(page_id).unwrap();
                        pool.unpin_page(page_id, false);
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("random_access", size),
            size,
            |b, &size| {
                let pool = create_bench_buffer_pool(size);
                let mut page_ids = Vec::new();
                for _ in 0..size * 2 {
                    let (_, page_id) = pool.new_page().unwrap();
                    pool.unpin_page(page_id, true);
                    page_ids.push(page_id);
                }
                let mut rng = thread_rng();

                b.iter(|| {
                    let page_id = *page_ids.choose(&mut rng).unwrap();
                    let _page = pool.fetch_page(page_id).unwrap();
                    pool.unpin_page(page_id, false);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, buffer_pool_benchmark);
criterion_main!(benches);
