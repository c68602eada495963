use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::types::{PageId, Rid, INVALID_PAGE_ID};
use crate::index::btree::error::BTreeError;
use crate::index::btree::node::{load_node, store_node, BTreeNode};
use crate::index::btree::tree::{Access, BPlusTree, DescentContext};

impl<K> BPlusTree<K>
where
    K: Clone + Ord + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Insert a key → RID entry. Returns false if the key already exists.
    pub fn insert(&self, key: K, value: Rid) -> Result<bool, BTreeError> {
        let mut ctx = DescentContext::new(self.root.lock());
        let result = self.insert_inner(key, value, &mut ctx);
        let dirty = matches!(result, Ok(true));
        ctx.release_all(&self.buffer_pool, dirty);
        result
    }

    fn insert_inner(
        &self,
        key: K,
        value: Rid,
        ctx: &mut DescentContext<'_>,
    ) -> Result<bool, BTreeError> {
        let root_id = **ctx.root_guard.as_ref().expect("insert without root guard");
        if root_id == INVALID_PAGE_ID {
            return self.start_new_tree(key, value, ctx);
        }

        self.descend_for_write(&key, Access::Insert, ctx)?;

        let leaf_idx = ctx.write_set.len() - 1;
        let leaf_id = ctx.write_set[leaf_idx].0;
        let mut leaf: BTreeNode<K> = load_node(&ctx.write_set[leaf_idx].1)?;

        if !leaf.leaf_insert(key, value) {
            return Ok(false);
        }

        if leaf.size() < self.leaf_max_size {
            store_node(&leaf, &mut ctx.write_set[leaf_idx].1)?;
            return Ok(true);
        }

        // Leaf overflow: move the upper half into a fresh sibling and
        // thread the leaf chain through it
        let (mut right, separator) = leaf.split_leaf();
        let (right_page, right_id) = self.buffer_pool.new_page()?;
        right.next_leaf = leaf.next_leaf;
        leaf.next_leaf = right_id;

        let was_root = leaf.is_root();
        let parent_id = if was_root {
            match self.create_new_root(leaf_id, separator.clone(), right_id, ctx) {
                Ok(id) => id,
                Err(e) => {
                    self.buffer_pool.unpin_page(right_id, false);
                    return Err(e);
                }
            }
        } else {
            leaf.parent_page_id
        };
        leaf.parent_page_id = parent_id;
        right.parent_page_id = parent_id;

        if let Err(e) = store_node(&leaf, &mut ctx.write_set[leaf_idx].1) {
            self.buffer_pool.unpin_page(right_id, false);
            return Err(e);
        }
        {
            let mut right_guard = right_page.write();
            if let Err(e) = store_node(&right, &mut right_guard) {
                drop(right_guard);
                self.buffer_pool.unpin_page(right_id, false);
                return Err(e);
            }
        }
        self.buffer_pool.unpin_page(right_id, true);

        if !was_root {
            self.insert_into_parent(ctx, leaf_idx, separator, right_id)?;
        }
        Ok(true)
    }

    /// First insert into an empty tree: the root is born as a leaf
    fn start_new_tree(
        &self,
        key: K,
        value: Rid,
        ctx: &mut DescentContext<'_>,
    ) -> Result<bool, BTreeError> {
        let (page, root_id) = self.buffer_pool.new_page()?;
        let mut leaf = BTreeNode::new_leaf(INVALID_PAGE_ID);
        leaf.leaf_insert(key, value);
        {
            let mut guard = page.write();
            if let Err(e) = store_node(&leaf, &mut guard) {
                drop(guard);
                self.buffer_pool.unpin_page(root_id, false);
                return Err(e);
            }
        }
        self.buffer_pool.unpin_page(root_id, true);

        **ctx.root_guard.as_mut().expect("insert without root guard") = root_id;
        self.register_root(root_id)?;
        debug!("btree {}: new root leaf {}", self.name, root_id);
        Ok(true)
    }

    /// Push a separator into the parent of the split node at
    /// `ctx.write_set[child_idx]`, splitting upward while parents overflow.
    /// The split node and its new sibling are already stored.
    fn insert_into_parent(
        &self,
        ctx: &mut DescentContext<'_>,
        child_idx: usize,
        separator: K,
        right_id: PageId,
    ) -> Result<(), BTreeError> {
        debug_assert!(child_idx >= 1, "split child has no latched parent");
        let parent_idx = child_idx - 1;
        let parent_id = ctx.write_set[parent_idx].0;
        let mut parent: BTreeNode<K> = load_node(&ctx.write_set[parent_idx].1)?;

        parent.internal_insert(separator, right_id);
        if parent.size() < self.internal_max_size {
            store_node(&parent, &mut ctx.write_set[parent_idx].1)?;
            return Ok(());
        }

        // Parent overflow: split and keep propagating
        let (mut right_node, push_up) = parent.split_internal();
        let (right_page, new_right_id) = self.buffer_pool.new_page()?;

        let was_root = parent.is_root();
        let grandparent_id = if was_root {
            match self.create_new_root(parent_id, push_up.clone(), new_right_id, ctx) {
                Ok(id) => id,
                Err(e) => {
                    self.buffer_pool.unpin_page(new_right_id, false);
                    return Err(e);
                }
            }
        } else {
            parent.parent_page_id
        };
        parent.parent_page_id = grandparent_id;
        right_node.parent_page_id = grandparent_id;

        if let Err(e) = store_node(&parent, &mut ctx.write_set[parent_idx].1) {
            self.buffer_pool.unpin_page(new_right_id, false);
            return Err(e);
        }
        {
            let mut right_guard = right_page.write();
            if let Err(e) = store_node(&right_node, &mut right_guard) {
                drop(right_guard);
                self.buffer_pool.unpin_page(new_right_id, false);
                return Err(e);
            }
        }
        self.buffer_pool.unpin_page(new_right_id, true);

        // Children that moved to the new sibling now answer to it
        let moved_children = right_node.children.clone();
        for moved in moved_children {
            self.reparent(ctx, moved, new_right_id)?;
        }

        if !was_root {
            self.insert_into_parent(ctx, parent_idx, push_up, new_right_id)?;
        }
        Ok(())
    }

    /// Allocate a new internal root over two children and swing the root
    /// pointer (held exclusively through `ctx`) onto it.
    fn create_new_root(
        &self,
        left_id: PageId,
        key: K,
        right_id: PageId,
        ctx: &mut DescentContext<'_>,
    ) -> Result<PageId, BTreeError> {
        let (page, new_root_id) = self.buffer_pool.new_page()?;
        let mut root = BTreeNode::new_internal(INVALID_PAGE_ID);
        root.keys.push(key);
        root.children = vec![left_id, right_id];
        {
            let mut guard = page.write();
            if let Err(e) = store_node(&root, &mut guard) {
                drop(guard);
                self.buffer_pool.unpin_page(new_root_id, false);
                return Err(e);
            }
        }
        self.buffer_pool.unpin_page(new_root_id, true);

        **ctx.root_guard.as_mut().expect("root split without root guard") = new_root_id;
        self.register_root(new_root_id)?;
        debug!("btree {}: new internal root {}", self.name, new_root_id);
        Ok(new_root_id)
    }

    /// Rewrite one node's parent pointer. The caller holds the W-latch on
    /// every path leading to this page, so the direct latch is uncontended
    /// except for stragglers draining out of the subtree.
    pub(crate) fn set_parent(
        &self,
        page_id: PageId,
        parent_id: PageId,
    ) -> Result<(), BTreeError> {
        let page = self.buffer_pool.fetch_page(page_id)?;
        let result = {
            let mut guard = page.write();
            load_node::<K>(&guard).and_then(|mut node| {
                node.parent_page_id = parent_id;
                store_node(&node, &mut guard)
            })
        };
        self.buffer_pool.unpin_page(page_id, result.is_ok());
        result
    }
}
