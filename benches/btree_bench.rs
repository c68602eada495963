use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use std::sync::Arc;

use loondb::common::types::Rid;
use loondb::index::btree::BPlusTree;
use loondb::storage::buffer::BufferPoolManager;

fn create_bench_tree(pool_size: usize) -> BPlusTree<i64> {
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();
    std::mem::forget(temp_file);

    let pool = Arc::new(BufferPoolManager::new(pool_size, path).unwrap());
    BPlusTree::new("bench", pool, 64, 64).unwrap()
}

fn btree_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BPlusTree");

    for count in [1_000i64, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("insert_sequential", count),
            count,
            |b, &count| {
                b.iter_with_setup(
                    || create_bench_tree(512),
                    |tree| {
                        for key in 0..count {
                            tree.insert(key, Rid::new(1, key as u32)).unwrap();
                        }
                    },
                );
            },
        );

        group.bench_with_input(BenchmarkId::new("search", count), count, |b, &count| {
            let tree = create_bench_tree(512);
            let mut keys: Vec<i64> = (0..count).collect();
            keys.shuffle(&mut thread_rng());
            for &key in &keys {
                tree.insert(key, Rid::new(1, key as u32)).unwrap();
            }
            let mut rng = thread_rng();

            b.iter(|| {
                let key = rng.gen_range(0..count);
                tree.search(&key).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, btree_benchmark);
criterion_main!(benches);
