use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::types::{PageId, PageReadGuard, Rid, INVALID_PAGE_ID};
use crate::index::btree::error::BTreeError;
use crate::index::btree::node::{load_node, BTreeNode};
use crate::index::btree::tree::BPlusTree;
use crate::storage::buffer::BufferPoolManager;

/// Ordered cursor over the leaf chain. Holds a read latch and a pin on its
/// current leaf; advancing past the last slot hops to the next leaf
/// hand-over-hand.
pub struct BPlusTreeIterator<K> {
    buffer_pool: Arc<BufferPoolManager>,
    page_id: PageId,
    guard: Option<PageReadGuard>,
    node: Option<BTreeNode<K>>,
    index: usize,
}

impl<K> BPlusTreeIterator<K>
where
    K: Clone + Ord + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn empty(buffer_pool: Arc<BufferPoolManager>) -> Self {
        Self {
            buffer_pool,
            page_id: INVALID_PAGE_ID,
            guard: None,
            node: None,
            index: 0,
        }
    }

    pub(crate) fn positioned(
        buffer_pool: Arc<BufferPoolManager>,
        page_id: PageId,
        guard: PageReadGuard,
        node: BTreeNode<K>,
        index: usize,
    ) -> Self {
        Self {
            buffer_pool,
            page_id,
            guard: Some(guard),
            node: Some(node),
            index,
        }
    }

    /// Next key/RID pair in comparator order, or `None` at the end
    pub fn next(&mut self) -> Result<Option<(K, Rid)>, BTreeError> {
        loop {
            let node = match &self.node {
                Some(node) => node,
                None => return Ok(None),
            };

            if self.index < node.keys.len() {
                let entry = (node.keys[self.index].clone(), node.values[self.index]);
                self.index += 1;
                return Ok(Some(entry));
            }

            let next_id = node.next_leaf;
            if next_id == INVALID_PAGE_ID {
                self.release();
                return Ok(None);
            }

            // Latch the next leaf before letting go of the current one
            let page = match self.buffer_pool.fetch_page(next_id) {
                Ok(page) => page,
                Err(e) => {
                    self.release();
                    return Err(e.into());
                }
            };
            let guard = page.read_arc();
            let next_node: BTreeNode<K> = match load_node(&guard) {
                Ok(node) => node,
                Err(e) => {
                    drop(guard);
                    self.buffer_pool.unpin_page(next_id, false);
                    self.release();
                    return Err(e);
                }
            };

            self.release();
            self.page_id = next_id;
            self.guard = Some(guard);
            self.node = Some(next_node);
            self.index = 0;
        }
    }

    fn release(&mut self) {
        if let Some(guard) = self.guard.take() {
            drop(guard);
            self.buffer_pool.unpin_page(self.page_id, false);
        }
        self.node = None;
        self.page_id = INVALID_PAGE_ID;
    }
}

impl<K> Drop for BPlusTreeIterator<K> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            drop(guard);
            self.buffer_pool.unpin_page(self.page_id, false);
        }
    }
}

impl<K> BPlusTree<K>
where
    K: Clone + Ord + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Cursor positioned at the smallest key
    pub fn iter(&self) -> Result<BPlusTreeIterator<K>, BTreeError> {
        self.leftmost_descent(None)
    }

    /// Cursor positioned at the first key >= `key`
    pub fn iter_from(&self, key: &K) -> Result<BPlusTreeIterator<K>, BTreeError> {
        self.leftmost_descent(Some(key))
    }

    fn leftmost_descent(&self, key: Option<&K>) -> Result<BPlusTreeIterator<K>, BTreeError> {
        let root_guard = self.root.lock();
        let root_id = *root_guard;
        if root_id == INVALID_PAGE_ID {
            return Ok(BPlusTreeIterator::empty(self.buffer_pool.clone()));
        }

        let page = self.buffer_pool.fetch_page(root_id)?;
        let mut guard = page.read_arc();
        drop(root_guard);
        let mut page_id = root_id;

        loop {
            let node: BTreeNode<K> = match load_node(&guard) {
                Ok(node) => node,
                Err(e) => {
                    drop(guard);
                    self.buffer_pool.unpin_page(page_id, false);
                    return Err(e);
                }
            };

            if node.is_leaf {
                let index = match key {
                    Some(key) => match node.find_key_index(key) {
                        Ok(pos) => pos,
                        Err(pos) => pos,
                    },
                    None => 0,
                };
                return Ok(BPlusTreeIterator::positioned(
                    self.buffer_pool.clone(),
                    page_id,
                    guard,
                    node,
                    index,
                ));
            }

            let child_id = match key {
                Some(key) => node.children[node.child_index_for(key)],
                None => node.children[0],
            };
            let child_page = match self.buffer_pool.fetch_page(child_id) {
                Ok(page) => page,
                Err(e) => {
                    drop(guard);
                    self.buffer_pool.unpin_page(page_id, false);
                    return Err(e.into());
                }
            };
            let child_guard = child_page.read_arc();
            drop(guard);
            self.buffer_pool.unpin_page(page_id, false);
            guard = child_guard;
            page_id = child_id;
        }
    }
}
