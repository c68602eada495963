use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::types::INVALID_PAGE_ID;
use crate::index::btree::error::BTreeError;
use crate::index::btree::node::{load_node, store_node, BTreeNode};
use crate::index::btree::tree::{Access, BPlusTree, DescentContext};

impl<K> BPlusTree<K>
where
    K: Clone + Ord + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Delete a key. Absent keys are a no-op.
    pub fn remove(&self, key: &K) -> Result<(), BTreeError> {
        let mut ctx = DescentContext::new(self.root.lock());
        let result = self.remove_inner(key, &mut ctx);
        ctx.release_all(&self.buffer_pool, result.is_ok());
        ctx.drop_deleted(&self.buffer_pool)?;
        result
    }

    fn remove_inner(&self, key: &K, ctx: &mut DescentContext<'_>) -> Result<(), BTreeError> {
        let root_id = **ctx.root_guard.as_ref().expect("delete without root guard");
        if root_id == INVALID_PAGE_ID {
            return Ok(());
        }

        self.descend_for_write(key, Access::Delete, ctx)?;

        let leaf_idx = ctx.write_set.len() - 1;
        let mut leaf: BTreeNode<K> = load_node(&ctx.write_set[leaf_idx].1)?;

        if !leaf.leaf_remove(key) {
            return Ok(());
        }

        if leaf.is_root() {
            if leaf.size() == 0 {
                // Tree is now empty
                **ctx.root_guard.as_mut().expect("delete without root guard") = INVALID_PAGE_ID;
                self.register_root(INVALID_PAGE_ID)?;
                let (page_id, guard) = ctx.write_set.pop().expect("leaf missing from write set");
                drop(guard);
                self.buffer_pool.unpin_page(page_id, false);
                ctx.deleted.push(page_id);
                debug!("btree {}: root leaf emptied", self.name);
                return Ok(());
            }
            store_node(&leaf, &mut ctx.write_set[leaf_idx].1)?;
            return Ok(());
        }

        store_node(&leaf, &mut ctx.write_set[leaf_idx].1)?;
        if leaf.size() >= self.leaf_min_size() {
            return Ok(());
        }

        self.coalesce_or_redistribute(ctx, leaf_idx, leaf)
    }

    /// Fix an underflowed non-root node at `ctx.write_set[node_idx]` by
    /// borrowing from a sibling when the pair can afford it, or merging
    /// otherwise. Merging may recurse into the parent.
    fn coalesce_or_redistribute(
        &self,
        ctx: &mut DescentContext<'_>,
        node_idx: usize,
        mut node: BTreeNode<K>,
    ) -> Result<(), BTreeError> {
        debug_assert!(node_idx >= 1, "underflowed node has no latched parent");
        let node_id = ctx.write_set[node_idx].0;
        let parent_idx = node_idx - 1;
        let mut parent: BTreeNode<K> = load_node(&ctx.write_set[parent_idx].1)?;

        let pos = parent
            .child_position(node_id)
            .expect("underflowed node missing from its parent");
        let (sib_pos, sib_on_left) = if pos > 0 { (pos - 1, true) } else { (pos + 1, false) };
        let sib_id = parent.children[sib_pos];

        let sib_page = self.buffer_pool.fetch_page(sib_id)?;
        let mut sib_guard = sib_page.write_arc();
        let mut sibling: BTreeNode<K> = match load_node(&sib_guard) {
            Ok(node) => node,
            Err(e) => {
                drop(sib_guard);
                self.buffer_pool.unpin_page(sib_id, false);
                return Err(e);
            }
        };

        if node.size() + sibling.size() >= self.max_size_of(&node) {
            // Redistribute one entry across the separator
            if node.is_leaf {
                if sib_on_left {
                    let k = sibling.keys.pop().expect("left sibling underfull");
                    let v = sibling.values.pop().expect("left sibling underfull");
                    node.keys.insert(0, k);
                    node.values.insert(0, v);
                    parent.keys[pos - 1] = node.keys[0].clone();
                } else {
                    node.keys.push(sibling.keys.remove(0));
                    node.values.push(sibling.values.remove(0));
                    parent.keys[pos] = sibling.keys[0].clone();
                }
            } else if sib_on_left {
                let sep_idx = pos - 1;
                node.keys.insert(0, parent.keys[sep_idx].clone());
                parent.keys[sep_idx] = sibling.keys.pop().expect("left sibling underfull");
                let moved = sibling.children.pop().expect("left sibling underfull");
                node.children.insert(0, moved);
                if let Err(e) = self.reparent(ctx, moved, node_id) {
                    drop(sib_guard);
                    self.buffer_pool.unpin_page(sib_id, false);
                    return Err(e);
                }
            } else {
                let sep_idx = pos;
                node.keys.push(parent.keys[sep_idx].clone());
                parent.keys[sep_idx] = sibling.keys.remove(0);
                let moved = sibling.children.remove(0);
                node.children.push(moved);
                if let Err(e) = self.reparent(ctx, moved, node_id) {
                    drop(sib_guard);
                    self.buffer_pool.unpin_page(sib_id, false);
                    return Err(e);
                }
            }

            store_node(&node, &mut ctx.write_set[node_idx].1)?;
            if let Err(e) = store_node(&sibling, &mut sib_guard) {
                drop(sib_guard);
                self.buffer_pool.unpin_page(sib_id, false);
                return Err(e);
            }
            drop(sib_guard);
            self.buffer_pool.unpin_page(sib_id, true);
            store_node(&parent, &mut ctx.write_set[parent_idx].1)?;
            return Ok(());
        }

        // Coalesce: the right node's entries move into the left node and
        // the separator leaves the parent
        let merge_into_sibling = sib_on_left;
        let sep_idx = if sib_on_left { pos - 1 } else { pos };
        let (mut left, right) = if merge_into_sibling {
            (sibling, node)
        } else {
            (node, sibling)
        };
        let (left_id, right_id) = if merge_into_sibling {
            (sib_id, node_id)
        } else {
            (node_id, sib_id)
        };

        if left.is_leaf {
            left.keys.extend(right.keys);
            left.values.extend(right.values);
            left.next_leaf = right.next_leaf;
        } else {
            left.keys.push(parent.keys[sep_idx].clone());
            for &child in &right.children {
                if let Err(e) = self.reparent(ctx, child, left_id) {
                    drop(sib_guard);
                    self.buffer_pool.unpin_page(sib_id, false);
                    return Err(e);
                }
            }
            left.keys.extend(right.keys);
            left.children.extend(right.children);
        }
        parent.keys.remove(sep_idx);
        parent.children.remove(sep_idx + 1);

        let root_collapses = parent.is_root() && parent.children.len() == 1;
        if root_collapses {
            left.parent_page_id = INVALID_PAGE_ID;
        }

        if merge_into_sibling {
            // Left half lives in the sibling's page; this node's page dies
            if let Err(e) = store_node(&left, &mut sib_guard) {
                drop(sib_guard);
                self.buffer_pool.unpin_page(sib_id, false);
                return Err(e);
            }
            drop(sib_guard);
            self.buffer_pool.unpin_page(sib_id, true);

            let (page_id, guard) = ctx.write_set.remove(node_idx);
            drop(guard);
            self.buffer_pool.unpin_page(page_id, false);
            ctx.deleted.push(page_id);
        } else {
            store_node(&left, &mut ctx.write_set[node_idx].1)?;
            drop(sib_guard);
            self.buffer_pool.unpin_page(sib_id, false);
            ctx.deleted.push(sib_id);
        }
        debug!("btree {}: merged node {} into {}", self.name, right_id, left_id);

        if root_collapses {
            // The sole surviving child becomes the new root
            **ctx.root_guard.as_mut().expect("root collapse without root guard") = left_id;
            self.register_root(left_id)?;
            let (page_id, guard) = ctx.write_set.remove(parent_idx);
            drop(guard);
            self.buffer_pool.unpin_page(page_id, false);
            ctx.deleted.push(page_id);
            debug!("btree {}: root collapsed to {}", self.name, left_id);
            return Ok(());
        }

        store_node(&parent, &mut ctx.write_set[parent_idx].1)?;
        if !parent.is_root() && parent.size() < self.internal_min_size() {
            return self.coalesce_or_redistribute(ctx, parent_idx, parent);
        }
        Ok(())
    }
}
