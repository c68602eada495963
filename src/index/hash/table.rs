use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::types::{Page, PageId, HEADER_PAGE_ID};
use crate::index::hash::bucket::Bucket;
use crate::index::hash::directory::{Directory, MAX_GLOBAL_DEPTH};
use crate::index::hash::error::HashIndexError;
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::HeaderPage;

/// Default bucket capacity when the caller does not pick one
pub const DEFAULT_BUCKET_CAPACITY: usize = 32;

/// Concurrent extendible hash index: unordered key → value map over a
/// directory page and fixed-capacity bucket pages.
///
/// Two locking tiers: the table latch guards the directory (readers for
/// lookups and plain inserts, writer for splits and merges), and each
/// bucket's page latch guards its slots.
pub struct ExtendibleHashTable<K, V> {
    name: String,
    buffer_pool: Arc<BufferPoolManager>,
    directory_page_id: PageId,
    bucket_capacity: usize,
    table_latch: RwLock<()>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: Clone + Eq + Hash + Serialize + DeserializeOwned + Send + Sync + 'static,
    V: Clone + Eq + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a depth-0 table with one empty bucket and register its
    /// directory page on the header page.
    pub fn new(
        name: impl Into<String>,
        buffer_pool: Arc<BufferPoolManager>,
        bucket_capacity: usize,
    ) -> Result<Self, HashIndexError> {
        assert!(bucket_capacity >= 1);
        buffer_pool.ensure_header_page()?;

        let (bucket_page, bucket_page_id) = buffer_pool.new_page()?;
        let bucket: Bucket<K, V> = Bucket::new(bucket_capacity);
        {
            let mut guard = bucket_page.write();
            store_page(&bucket, &mut guard)?;
        }
        buffer_pool.unpin_page(bucket_page_id, true);

        let (dir_page, directory_page_id) = buffer_pool.new_page()?;
        let directory = Directory::new(bucket_page_id);
        {
            let mut guard = dir_page.write();
            store_page(&directory, &mut guard)?;
        }
        buffer_pool.unpin_page(directory_page_id, true);

        let table = Self {
            name: name.into(),
            buffer_pool,
            directory_page_id,
            bucket_capacity,
            table_latch: RwLock::new(()),
            _phantom: PhantomData,
        };
        table.register_directory()?;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn global_depth(&self) -> Result<u32, HashIndexError> {
        let _table = self.table_latch.read();
        Ok(self.load_directory()?.global_depth)
    }

    fn register_directory(&self) -> Result<(), HashIndexError> {
        let page = self.buffer_pool.fetch_page(HEADER_PAGE_ID)?;
        let result = {
            let mut guard = page.write();
            let header = HeaderPage::new();
            match header.update_record(&mut guard, &self.name, self.directory_page_id) {
                Ok(true) => Ok(()),
                Ok(false) => header
                    .insert_record(&mut guard, &self.name, self.directory_page_id)
                    .map(|_| ()),
                Err(e) => Err(e),
            }
        };
        self.buffer_pool.unpin_page(HEADER_PAGE_ID, true);
        result?;
        Ok(())
    }

    fn hash_of(&self, key: &K) -> u32 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as u32
    }

    fn load_directory(&self) -> Result<Directory, HashIndexError> {
        let page = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let directory = {
            let guard = page.read();
            load_page::<Directory>(&guard)
        };
        self.buffer_pool.unpin_page(self.directory_page_id, false);
        directory
    }

    fn store_directory(&self, directory: &Directory) -> Result<(), HashIndexError> {
        let page = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let result = {
            let mut guard = page.write();
            store_page(directory, &mut guard)
        };
        self.buffer_pool.unpin_page(self.directory_page_id, result.is_ok());
        result
    }

    /// Every value stored under `key`
    pub fn get(&self, key: &K) -> Result<Vec<V>, HashIndexError> {
        let _table = self.table_latch.read();
        let directory = self.load_directory()?;
        let index = directory.index_of(self.hash_of(key));
        let bucket_page_id = directory.bucket_page_ids[index];

        let page = self.buffer_pool.fetch_page(bucket_page_id)?;
        let result = {
            let guard = page.read();
            load_page::<Bucket<K, V>>(&guard).map(|bucket| bucket.get_all(key))
        };
        self.buffer_pool.unpin_page(bucket_page_id, false);
        result
    }

    /// Insert a pair; duplicate `(key, value)` pairs are rejected with
    /// `Ok(false)`. A full bucket triggers a split and a retry.
    pub fn insert(&self, key: K, value: V) -> Result<bool, HashIndexError> {
        loop {
            {
                let _table = self.table_latch.read();
                let directory = self.load_directory()?;
                let index = directory.index_of(self.hash_of(&key));
                let bucket_page_id = directory.bucket_page_ids[index];

                let page = self.buffer_pool.fetch_page(bucket_page_id)?;
                let mut guard = page.write();
                let mut bucket = match load_page::<Bucket<K, V>>(&guard) {
                    Ok(bucket) => bucket,
                    Err(e) => {
                        drop(guard);
                        self.buffer_pool.unpin_page(bucket_page_id, false);
                        return Err(e);
                    }
                };

                if bucket.contains(&key, &value) {
                    drop(guard);
                    self.buffer_pool.unpin_page(bucket_page_id, false);
                    return Ok(false);
                }

                if !bucket.is_full() {
                    bucket.insert(key, value);
                    let result = store_page(&bucket, &mut guard);
                    drop(guard);
                    self.buffer_pool.unpin_page(bucket_page_id, result.is_ok());
                    result?;
                    return Ok(true);
                }

                drop(guard);
                self.buffer_pool.unpin_page(bucket_page_id, false);
            }

            // Bucket full: take the table writer latch and split, then retry
            self.split_bucket(&key)?;
        }
    }

    /// Split the bucket covering `key`, growing the directory when its
    /// local depth has caught up with the global depth.
    fn split_bucket(&self, key: &K) -> Result<(), HashIndexError> {
        let _table = self.table_latch.write();
        let mut directory = self.load_directory()?;
        let index = directory.index_of(self.hash_of(key));
        let bucket_page_id = directory.bucket_page_ids[index];

        let page = self.buffer_pool.fetch_page(bucket_page_id)?;
        let mut guard = page.write();
        let mut bucket = match load_page::<Bucket<K, V>>(&guard) {
            Ok(bucket) => bucket,
            Err(e) => {
                drop(guard);
                self.buffer_pool.unpin_page(bucket_page_id, false);
                return Err(e);
            }
        };

        if !bucket.is_full() {
            // Lost the race to another split; nothing to do
            drop(guard);
            self.buffer_pool.unpin_page(bucket_page_id, false);
            return Ok(());
        }

        let local = directory.local_depths[index] as u32;
        if local >= MAX_GLOBAL_DEPTH {
            drop(guard);
            self.buffer_pool.unpin_page(bucket_page_id, false);
            return Err(HashIndexError::DirectoryLimit);
        }

        if local == directory.global_depth {
            directory.grow();
        }

        let (image_page, image_page_id) = match self.buffer_pool.new_page() {
            Ok(pair) => pair,
            Err(e) => {
                drop(guard);
                self.buffer_pool.unpin_page(bucket_page_id, false);
                return Err(e.into());
            }
        };

        // Every slot sharing the bucket's low `local` bits gets the deeper
        // depth; those with the new bit set point at the image
        let old_mask = (1usize << local) - 1;
        let new_local = (local + 1) as u8;
        for slot in 0..directory.size() {
            if slot & old_mask == index & old_mask {
                directory.local_depths[slot] = new_local;
                if (slot >> local) & 1 == 1 {
                    directory.bucket_page_ids[slot] = image_page_id;
                }
            }
        }

        // Rehash the full bucket under the widened mask
        let mut image: Bucket<K, V> = Bucket::new(self.bucket_capacity);
        for (k, v) in bucket.drain_entries() {
            if (self.hash_of(&k) >> local) & 1 == 1 {
                image.insert(k, v);
            } else {
                bucket.insert(k, v);
            }
        }

        let result = store_page(&bucket, &mut guard);
        drop(guard);
        self.buffer_pool.unpin_page(bucket_page_id, result.is_ok());
        result?;

        let result = {
            let mut image_guard = image_page.write();
            store_page(&image, &mut image_guard)
        };
        self.buffer_pool.unpin_page(image_page_id, result.is_ok());
        result?;

        self.store_directory(&directory)?;
        debug!(
            "hash {}: split bucket {} into {} (global depth {})",
            self.name, bucket_page_id, image_page_id, directory.global_depth
        );
        Ok(())
    }

    /// Remove a pair; `Ok(false)` if it is not present. Emptying a bucket
    /// triggers a merge attempt.
    pub fn remove(&self, key: &K, value: &V) -> Result<bool, HashIndexError> {
        let now_empty;
        {
            let _table = self.table_latch.read();
            let directory = self.load_directory()?;
            let index = directory.index_of(self.hash_of(key));
            let bucket_page_id = directory.bucket_page_ids[index];

            let page = self.buffer_pool.fetch_page(bucket_page_id)?;
            let mut guard = page.write();
            let mut bucket = match load_page::<Bucket<K, V>>(&guard) {
                Ok(bucket) => bucket,
                Err(e) => {
                    drop(guard);
                    self.buffer_pool.unpin_page(bucket_page_id, false);
                    return Err(e);
                }
            };

            if !bucket.remove(key, value) {
                drop(guard);
                self.buffer_pool.unpin_page(bucket_page_id, false);
                return Ok(false);
            }
            now_empty = bucket.is_empty();

            let result = store_page(&bucket, &mut guard);
            drop(guard);
            self.buffer_pool.unpin_page(bucket_page_id, result.is_ok());
            result?;
        }

        if now_empty {
            self.merge_bucket(key)?;
        }
        Ok(true)
    }

    /// Fold an empty bucket back into its split image and shrink the
    /// directory as far as the local depths allow.
    fn merge_bucket(&self, key: &K) -> Result<(), HashIndexError> {
        let _table = self.table_latch.write();
        let mut directory = self.load_directory()?;
        let index = directory.index_of(self.hash_of(key));
        let local = directory.local_depths[index] as u32;
        if local == 0 {
            return Ok(());
        }

        let image_index = directory.split_image_index(index);
        if directory.local_depths[image_index] as u32 != local {
            return Ok(());
        }

        let target_page_id = directory.bucket_page_ids[index];
        let image_page_id = directory.bucket_page_ids[image_index];
        if target_page_id == image_page_id {
            return Ok(());
        }

        // Somebody may have refilled the bucket since the remove
        let page = self.buffer_pool.fetch_page(target_page_id)?;
        let still_empty = {
            let guard = page.read();
            load_page::<Bucket<K, V>>(&guard).map(|b| b.is_empty())
        };
        self.buffer_pool.unpin_page(target_page_id, false);
        if !still_empty? {
            return Ok(());
        }


        let new_local = (local - 1) as u8;
        for slot in 0..directory.size() {
            let page_id = directory.bucket_page_ids[slot];
            if page_id == target_page_id || page_id == image_page_id {
                directory.bucket_page_ids[slot] = image_page_id;
                directory.local_depths[slot] = new_local;
            }
        }
        self.buffer_pool.delete_page(target_page_id)?;

        while directory.can_shrink() {
            directory.shrink();
        }
        self.store_directory(&directory)?;
        debug!(
            "hash {}: merged bucket {} into {} (global depth {})",
            self.name, target_page_id, image_page_id, directory.global_depth
        );
        Ok(())
    }
}

fn load_page<T: DeserializeOwned>(page: &Page) -> Result<T, HashIndexError> {
    bincode::deserialize(&page.data).map_err(|e| HashIndexError::Serialization(e.to_string()))
}

fn store_page<T: Serialize>(value: &T, page: &mut Page) -> Result<(), HashIndexError> {
    let bytes = bincode::serialize(value).map_err(|e| HashIndexError::Serialization(e.to_string()))?;
    if bytes.len() > page.data.len() {
        return Err(HashIndexError::Serialization(
            "page payload too large".to_string(),
        ));
    }
    page.data.fill(0);
    page.data[..bytes.len()].copy_from_slice(&bytes);
    Ok(())
}
