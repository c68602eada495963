use std::sync::Arc;
use std::thread;

use anyhow::Result;

mod common;
use common::{create_test_buffer_pool, init_logging};

use loondb::index::hash::ExtendibleHashTable;

#[test]
fn test_split_grows_directory() -> Result<()> {
    init_logging();
    let (buffer_pool, _file) = create_test_buffer_pool(32)?;
    // Bucket capacity 2: a third entry cannot fit without a split. At
    // global depth 0 every key routes to the single bucket.
    let table: ExtendibleHashTable<i64, i64> =
        ExtendibleHashTable::new("tiny_buckets", buffer_pool, 2)?;
    assert_eq!(table.global_depth()?, 0);

    assert!(table.insert(1, 10)?);
    assert!(table.insert(2, 20)?);
    assert!(table.insert(3, 30)?);

    assert!(table.global_depth()? >= 1);
    assert_eq!(table.get(&1)?, vec![10]);
    assert_eq!(table.get(&2)?, vec![20]);
    assert_eq!(table.get(&3)?, vec![30]);

    Ok(())
}

#[test]
fn test_duplicate_pair_rejected_but_values_multiply() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(32)?;
    let table: ExtendibleHashTable<i64, i64> =
        ExtendibleHashTable::new("dups", buffer_pool, 8)?;

    assert!(table.insert(1, 10)?);
    assert!(!table.insert(1, 10)?);
    assert!(table.insert(1, 11)?);

    let mut values = table.get(&1)?;
    values.sort();
    assert_eq!(values, vec![10, 11]);

    Ok(())
}

#[test]
fn test_remove_then_get_is_empty() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(32)?;
    let table: ExtendibleHashTable<i64, i64> =
        ExtendibleHashTable::new("removal", buffer_pool, 4)?;

    assert!(table.insert(5, 50)?);
    assert!(table.remove(&5, &50)?);
    assert!(table.get(&5)?.is_empty());
    assert!(!table.remove(&5, &50)?);

    Ok(())
}

#[test]
fn test_many_keys_split_and_survive() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(128)?;
    let table: ExtendibleHashTable<i64, i64> =
        ExtendibleHashTable::new("many", buffer_pool, 4)?;

    for key in 0..256 {
        assert!(table.insert(key, key * 10)?, "insert of {} failed", key);
    }
    assert!(table.global_depth()? >= 2);

    for key in 0..256 {
        assert_eq!(table.get(&key)?, vec![key * 10]);
    }

    Ok(())
}

#[test]
fn test_drain_shrinks_directory() -> Result<()> {
    init_logging();
    let (buffer_pool, _file) = create_test_buffer_pool(128)?;
    let table: ExtendibleHashTable<i64, i64> =
        ExtendibleHashTable::new("shrink", buffer_pool, 2)?;

    for key in 0..64 {
        table.insert(key, key)?;
    }
    let grown = table.global_depth()?;
    assert!(grown >= 1);

    for key in 0..64 {
        assert!(table.remove(&key, &key)?);
    }
    for key in 0..64 {
        assert!(table.get(&key)?.is_empty());
    }
    // Empty buckets merge pairwise and the directory collapses with them
    assert!(table.global_depth()? < grown);

    Ok(())
}

#[test]
fn test_concurrent_inserts_and_reads() -> Result<()> {
    init_logging();
    let (buffer_pool, _file) = create_test_buffer_pool(128)?;
    let table: Arc<ExtendibleHashTable<i64, i64>> =
        Arc::new(ExtendibleHashTable::new("concurrent", buffer_pool, 4)?);

    let threads = 4;
    let per_thread = 64;
    let mut handles = Vec::new();
    for t in 0..threads {
        let table = table.clone();
        handles.push(thread::spawn(move || {
            for i in 0..per_thread {
                let key = (i * threads + t) as i64;
                table.insert(key, key * 2).expect("insert failed");
                assert_eq!(table.get(&key).expect("get failed"), vec![key * 2]);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    for key in 0..(threads * per_thread) as i64 {
        assert_eq!(table.get(&key)?, vec![key * 2]);
    }

    Ok(())
}
