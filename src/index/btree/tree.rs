use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::types::{PageId, PageWriteGuard, Rid, HEADER_PAGE_ID, INVALID_PAGE_ID};
use crate::index::btree::error::BTreeError;
use crate::index::btree::node::{load_node, store_node, BTreeNode};
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::HeaderPage;

/// What a descent intends to do; decides latch modes and safety rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Insert,
    Delete,
}

/// Latch-crabbing state for one write operation.
///
/// `write_set` is a contiguous top-down suffix of ancestors, each W-latched
/// and pinned; `root_guard` is held while the root pointer may still change.
/// Reaching a safe node releases everything above it in one sweep.
pub(crate) struct DescentContext<'a> {
    pub root_guard: Option<MutexGuard<'a, PageId>>,
    pub write_set: Vec<(PageId, PageWriteGuard)>,
    pub deleted: Vec<PageId>,
}

impl<'a> DescentContext<'a> {
    pub fn new(root_guard: MutexGuard<'a, PageId>) -> Self {
        Self {
            root_guard: Some(root_guard),
            write_set: Vec::new(),
            deleted: Vec::new(),
        }
    }

    /// Unlatch and unpin every held ancestor, top-down, and let go of the
    /// root pointer. Called once the current node is proven safe.
    pub fn release_ancestors(&mut self, buffer_pool: &BufferPoolManager) {
        self.root_guard = None;
        for (page_id, guard) in self.write_set.drain(..) {
            drop(guard);
            buffer_pool.unpin_page(page_id, false);
        }
    }

    /// Unlatch and unpin everything still held at the end of an operation
    pub fn release_all(&mut self, buffer_pool: &BufferPoolManager, dirty: bool) {
        self.root_guard = None;
        for (page_id, guard) in self.write_set.drain(..) {
            drop(guard);
            buffer_pool.unpin_page(page_id, dirty);
        }
    }

    /// Drop pages queued for deletion; runs after all latches are gone
    pub fn drop_deleted(&mut self, buffer_pool: &BufferPoolManager) -> Result<(), BTreeError> {
        for page_id in self.deleted.drain(..) {
            buffer_pool.delete_page(page_id)?;
        }
        Ok(())
    }
}

/// Concurrent B+Tree index: ordered key → RID map over buffer-pool pages,
/// with latch crabbing for writers and hand-over-hand read latching for
/// lookups and scans.
pub struct BPlusTree<K> {
    pub(crate) name: String,
    pub(crate) buffer_pool: Arc<BufferPoolManager>,
    pub(crate) root: Mutex<PageId>,
    pub(crate) leaf_max_size: usize,
    pub(crate) internal_max_size: usize,
    pub(crate) _phantom: PhantomData<K>,
}

impl<K> BPlusTree<K>
where
    K: Clone + Ord + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create an empty tree and register its name on the header page.
    /// `leaf_max_size` / `internal_max_size` are counted in keys; the root
    /// is allocated lazily on first insert.
    pub fn new(
        name: impl Into<String>,
        buffer_pool: Arc<BufferPoolManager>,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Self, BTreeError> {
        assert!(leaf_max_size >= 2 && internal_max_size >= 3);

        buffer_pool.ensure_header_page()?;
        let tree = Self {
            name: name.into(),
            buffer_pool,
            root: Mutex::new(INVALID_PAGE_ID),
            leaf_max_size,
            internal_max_size,
            _phantom: PhantomData,
        };
        tree.register_root(INVALID_PAGE_ID)?;
        Ok(tree)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_page_id(&self) -> PageId {
        *self.root.lock()
    }

    pub fn is_empty(&self) -> bool {
        self.root_page_id() == INVALID_PAGE_ID
    }

    pub(crate) fn leaf_min_size(&self) -> usize {
        self.leaf_max_size / 2
    }

    pub(crate) fn internal_min_size(&self) -> usize {
        self.internal_max_size / 2
    }

    pub(crate) fn max_size_of(&self, node: &BTreeNode<K>) -> usize {
        if node.is_leaf {
            self.leaf_max_size
        } else {
            self.internal_max_size
        }
    }

    pub(crate) fn min_size_of(&self, node: &BTreeNode<K>) -> usize {
        if node.is_leaf {
            self.leaf_min_size()
        } else {
            self.internal_min_size()
        }
    }

    /// A node is safe when the pending operation cannot propagate past it
    pub(crate) fn is_safe(&self, node: &BTreeNode<K>, access: Access) -> bool {
        match access {
            Access::Insert => node.size() < self.max_size_of(node) - 1,
            Access::Delete => {
                if node.is_root() {
                    if node.is_leaf {
                        node.size() > 1
                    } else {
                        node.children.len() > 2
                    }
                } else {
                    node.size() > self.min_size_of(node)
                }
            }
        }
    }

    /// Record the current root page id under this tree's name on page 0
    pub(crate) fn register_root(&self, root_page_id: PageId) -> Result<(), BTreeError> {
        let page = self.buffer_pool.fetch_page(HEADER_PAGE_ID)?;
        let result = {
            let mut guard = page.write();
            let header = HeaderPage::new();
            match header.update_record(&mut guard, &self.name, root_page_id) {
                Ok(true) => Ok(()),
                Ok(false) => header.insert_record(&mut guard, &self.name, root_page_id).map(|_| ()),
                Err(e) => Err(e),
            }
        };
        self.buffer_pool.unpin_page(HEADER_PAGE_ID, true);
        result?;
        Ok(())
    }

    /// Point lookup. Returns every RID recorded under the key (at most one,
    /// duplicates are rejected on insert).
    pub fn search(&self, key: &K) -> Result<Vec<Rid>, BTreeError> {
        let root_guard = self.root.lock();
        let root_id = *root_guard;
        if root_id == INVALID_PAGE_ID {
            return Ok(Vec::new());
        }

        let page = match self.buffer_pool.fetch_page(root_id) {
            Ok(page) => page,
            Err(e) => return Err(e.into()),
        };
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
                let result = match node.find_key_index(key) {
                    Ok(pos) => vec![node.values[pos]],
                    Err(_) => Vec::new(),
                };
                drop(guard);
                self.buffer_pool.unpin_page(page_id, false);
                return Ok(result);
            }

            let child_id = node.children[node.child_index_for(key)];
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

    /// Repoint a child's parent pointer. When the child is one of the pages
    /// this very descent holds W-latched, the update goes through the held
    /// guard; latching it again would deadlock against ourselves.
    pub(crate) fn reparent(
        &self,
        ctx: &mut DescentContext<'_>,
        child_id: PageId,
        new_parent: PageId,
    ) -> Result<(), BTreeError> {
        if let Some(entry) = ctx.write_set.iter_mut().find(|(id, _)| *id == child_id) {
            let mut node: BTreeNode<K> = load_node(&entry.1)?;
            node.parent_page_id = new_parent;
            return store_node(&node, &mut entry.1);
        }
        self.set_parent(child_id, new_parent)
    }

    /// Crab down to the leaf covering `key`, W-latching as we go and
    /// releasing ancestors at each safe node. On return, `ctx.write_set`
    /// ends with the target leaf.
    pub(crate) fn descend_for_write(
        &self,
        key: &K,
        access: Access,
        ctx: &mut DescentContext<'_>,
    ) -> Result<(), BTreeError> {
        let mut page_id = **ctx.root_guard.as_ref().expect("descent without root guard");

        loop {
            let page = match self.buffer_pool.fetch_page(page_id) {
                Ok(page) => page,
                Err(e) => {
                    ctx.release_all(&self.buffer_pool, false);
                    return Err(e.into());
                }
            };
            let guard = page.write_arc();
            let node: BTreeNode<K> = match load_node(&guard) {
                Ok(node) => node,
                Err(e) => {
                    drop(guard);
                    self.buffer_pool.unpin_page(page_id, false);
                    ctx.release_all(&self.buffer_pool, false);
                    return Err(e);
                }
            };

            if self.is_safe(&node, access) {
                ctx.release_ancestors(&self.buffer_pool);
            }

            let is_leaf = node.is_leaf;
            let next = if is_leaf {
                INVALID_PAGE_ID
            } else {
                node.children[node.child_index_for(key)]
            };

            ctx.write_set.push((page_id, guard));
            if is_leaf {
                return Ok(());
            }
            page_id = next;
        }
    }
}
