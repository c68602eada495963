use std::sync::Arc;
use std::thread;

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::thread_rng;

mod common;
use common::{create_test_buffer_pool, init_logging};

use loondb::common::types::Rid;
use loondb::index::btree::BPlusTree;

fn rid_for(key: i64) -> Rid {
    Rid::new((key / 100) as u32 + 1, (key % 100) as u32)
}

fn collect_keys(tree: &BPlusTree<i64>) -> Result<Vec<i64>> {
    let mut iter = tree.iter()?;
    let mut keys = Vec::new();
    while let Some((key, _)) = iter.next()? {
        keys.push(key);
    }
    Ok(keys)
}

#[test]
fn test_round_trip_small_fanout() -> Result<()> {
    init_logging();
    let (buffer_pool, _file) = create_test_buffer_pool(32)?;
    let tree: BPlusTree<i64> = BPlusTree::new("small_fanout", buffer_pool, 3, 3)?;

    for key in 1..=10 {
        assert!(tree.insert(key, rid_for(key))?, "insert of {} failed", key);
    }

    for key in 1..=10 {
        assert_eq!(tree.search(&key)?, vec![rid_for(key)]);
    }
    assert!(tree.search(&11)?.is_empty());

    assert_eq!(collect_keys(&tree)?, (1..=10).collect::<Vec<_>>());

    for key in [3, 5, 8] {
        tree.remove(&key)?;
    }
    assert_eq!(collect_keys(&tree)?, vec![1, 2, 4, 6, 7, 9, 10]);
    for key in [3, 5, 8] {
        assert!(tree.search(&key)?.is_empty());
    }

    Ok(())
}

#[test]
fn test_duplicate_key_rejected() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(16)?;
    let tree: BPlusTree<i64> = BPlusTree::new("dups", buffer_pool, 4, 4)?;

    assert!(tree.insert(7, rid_for(7))?);
    assert!(!tree.insert(7, Rid::new(99, 99))?);
    assert_eq!(tree.search(&7)?, vec![rid_for(7)]);

    Ok(())
}

#[test]
fn test_shuffled_inserts_iterate_sorted() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(64)?;
    let tree: BPlusTree<i64> = BPlusTree::new("shuffled", buffer_pool, 4, 4)?;

    let mut keys: Vec<i64> = (0..200).collect();
    keys.shuffle(&mut thread_rng());
    for &key in &keys {
        assert!(tree.insert(key, rid_for(key))?);
    }

    assert_eq!(collect_keys(&tree)?, (0..200).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_iter_from_positions_at_key() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(32)?;
    let tree: BPlusTree<i64> = BPlusTree::new("ranged", buffer_pool, 3, 3)?;

    for key in (0..40).step_by(2) {
        tree.insert(key, rid_for(key))?;
    }

    // Exact hit
    let mut iter = tree.iter_from(&10)?;
    assert_eq!(iter.next()?.map(|(k, _)| k), Some(10));
    assert_eq!(iter.next()?.map(|(k, _)| k), Some(12));
    drop(iter);

    // Between keys: lands on the next larger one
    let mut iter = tree.iter_from(&11)?;
    assert_eq!(iter.next()?.map(|(k, _)| k), Some(12));
    drop(iter);

    // Past the end
    let mut iter = tree.iter_from(&100)?;
    assert_eq!(iter.next()?, None);

    Ok(())
}

#[test]
fn test_delete_everything_then_reuse() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(32)?;
    let tree: BPlusTree<i64> = BPlusTree::new("drain", buffer_pool, 3, 3)?;

    for key in 0..30 {
        tree.insert(key, rid_for(key))?;
    }
    for key in 0..30 {
        tree.remove(&key)?;
    }
    assert!(tree.is_empty());
    assert_eq!(collect_keys(&tree)?, Vec::<i64>::new());

    // Removing from the empty tree is a no-op
    tree.remove(&5)?;

    for key in [3, 1, 2] {
        assert!(tree.insert(key, rid_for(key))?);
    }
    assert_eq!(collect_keys(&tree)?, vec![1, 2, 3]);

    Ok(())
}

#[test]
fn test_reverse_order_inserts_and_interleaved_deletes() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(64)?;
    let tree: BPlusTree<i64> = BPlusTree::new("reverse", buffer_pool, 3, 3)?;

    for key in (0..100).rev() {
        tree.insert(key, rid_for(key))?;
    }
    for key in (0..100).filter(|k| k % 3 == 0) {
        tree.remove(&key)?;
    }

    let expected: Vec<i64> = (0..100).filter(|k| k % 3 != 0).collect();
    assert_eq!(collect_keys(&tree)?, expected);
    for key in expected {
        assert_eq!(tree.search(&key)?, vec![rid_for(key)]);
    }

    Ok(())
}

#[test]
fn test_concurrent_disjoint_inserts() -> Result<()> {
    init_logging();
    let (buffer_pool, _file) = create_test_buffer_pool(128)?;
    let tree: Arc<BPlusTree<i64>> = Arc::new(BPlusTree::new("concurrent", buffer_pool, 8, 8)?);

    let threads = 4;
    let per_thread = 64;
    let mut handles = Vec::new();
    for t in 0..threads {
        let tree = tree.clone();
        handles.push(thread::spawn(move || {
            for i in 0..per_thread {
                let key = (i * threads + t) as i64;
                tree.insert(key, rid_for(key)).expect("insert failed");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let total = (threads * per_thread) as i64;
    assert_eq!(collect_keys(&tree)?, (0..total).collect::<Vec<_>>());
    for key in 0..total {
        assert_eq!(tree.search(&key)?, vec![rid_for(key)]);
    }

    Ok(())
}
