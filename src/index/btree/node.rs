use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::common::types::{Page, PageId, Rid, INVALID_PAGE_ID};
use crate::index::btree::error::BTreeError;

/// B+Tree node, serialized whole into a page.
/// - Leaf nodes hold keys and record IDs, plus the forward leaf link.
/// - Internal nodes hold keys and child page IDs, with
///   `children.len() == keys.len() + 1`.
///
/// Parents are referenced by page id only and resolved through the buffer
/// pool; there are no in-memory parent pointers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BTreeNode<K> {
    pub is_leaf: bool,
    pub parent_page_id: PageId,
    pub keys: Vec<K>,
    pub children: Vec<PageId>,
    pub values: Vec<Rid>,
    pub next_leaf: PageId,
}

impl<K: Clone + Ord> BTreeNode<K> {
    pub fn new_leaf(parent_page_id: PageId) -> Self {
        Self {
            is_leaf: true,
            parent_page_id,
            keys: Vec::new(),
            children: Vec::new(),
            values: Vec::new(),
            next_leaf: INVALID_PAGE_ID,
        }
    }

    pub fn new_internal(parent_page_id: PageId) -> Self {
        Self {
            is_leaf: false,
            parent_page_id,
            keys: Vec::new(),
            children: Vec::new(),
            values: Vec::new(),
            next_leaf: INVALID_PAGE_ID,
        }
    }

    /// Node size counted in keys
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn is_root(&self) -> bool {
        self.parent_page_id == INVALID_PAGE_ID
    }

    /// Position of a key in the node
    pub fn find_key_index(&self, key: &K) -> Result<usize, usize> {
        self.keys.binary_search(key)
    }

    /// Index of the child subtree that covers the key
    pub fn child_index_for(&self, key: &K) -> usize {
        match self.keys.binary_search(key) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// Position of a child page within this internal node
    pub fn child_position(&self, page_id: PageId) -> Option<usize> {
        self.children.iter().position(|&c| c == page_id)
    }

    /// Insert into a leaf at sorted position; false if the key exists
    pub fn leaf_insert(&mut self, key: K, value: Rid) -> bool {
        debug_assert!(self.is_leaf);
        match self.keys.binary_search(&key) {
            Ok(_) => false,
            Err(pos) => {
                self.keys.insert(pos, key);
                self.values.insert(pos, value);
                true
            }
        }
    }

    /// Remove a key from a leaf; false if absent
    pub fn leaf_remove(&mut self, key: &K) -> bool {
        debug_assert!(self.is_leaf);
        match self.keys.binary_search(key) {
            Ok(pos) => {
                self.keys.remove(pos);
                self.values.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Split a full leaf: the upper half moves into the returned node, and
    /// the returned key (a copy of the new node's first) is the separator
    /// to push into the parent.
    pub fn split_leaf(&mut self) -> (BTreeNode<K>, K) {
        debug_assert!(self.is_leaf);
        let mid = self.keys.len() / 2;
        let mut right = BTreeNode::new_leaf(self.parent_page_id);
        right.keys = self.keys.split_off(mid);
        right.values = self.values.split_off(mid);
        let separator = right.keys[0].clone();
        (right, separator)
    }

    /// Insert a separator and its right child into an internal node
    pub fn internal_insert(&mut self, key: K, right_child: PageId) {
        debug_assert!(!self.is_leaf);
        let pos = match self.keys.binary_search(&key) {
            Ok(pos) => pos,
            Err(pos) => pos,
        };
        self.keys.insert(pos, key);
        self.children.insert(pos + 1, right_child);
    }

    /// Split a full internal node. The middle key moves up (it appears in
    /// neither half); the upper halves of keys and children move into the
    /// returned node.
    pub fn split_internal(&mut self) -> (BTreeNode<K>, K) {
        debug_assert!(!self.is_leaf);
        let mid = self.keys.len() / 2;
        let push_up = self.keys[mid].clone();

        let mut right = BTreeNode::new_internal(self.parent_page_id);
        right.keys = self.keys.split_off(mid + 1);
        right.children = self.children.split_off(mid + 1);
        self.keys.pop();

        (right, push_up)
    }
}

/// Deserialize a node from page bytes
pub fn load_node<K: DeserializeOwned>(page: &Page) -> Result<BTreeNode<K>, BTreeError> {
    bincode::deserialize(&page.data).map_err(|e| BTreeError::Serialization(e.to_string()))
}

/// Serialize a node into page bytes
pub fn store_node<K: Serialize>(node: &BTreeNode<K>, page: &mut Page) -> Result<(), BTreeError> {
    let bytes = bincode::serialize(node).map_err(|e| BTreeError::Serialization(e.to_string()))?;
    if bytes.len() > page.data.len() {
        return Err(BTreeError::NodeTooLarge);
    }
    page.data.fill(0);
    page.data[..bytes.len()].copy_from_slice(&bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_insert_sorted_and_duplicate() {
        let mut leaf: BTreeNode<i32> = BTreeNode::new_leaf(INVALID_PAGE_ID);
        assert!(leaf.leaf_insert(5, Rid::new(1, 0)));
        assert!(leaf.leaf_insert(1, Rid::new(1, 1)));
        assert!(leaf.leaf_insert(3, Rid::new(1, 2)));
        assert!(!leaf.leaf_insert(3, Rid::new(1, 3)));
        assert_eq!(leaf.keys, vec![1, 3, 5]);
    }

    #[test]
    fn test_leaf_split_moves_upper_half() {
        let mut leaf: BTreeNode<i32> = BTreeNode::new_leaf(INVALID_PAGE_ID);
        for i in 0..4 {
            leaf.leaf_insert(i, Rid::new(1, i as u32));
        }
        let (right, sep) = leaf.split_leaf();
        assert_eq!(leaf.keys, vec![0, 1]);
        assert_eq!(right.keys, vec![2, 3]);
        assert_eq!(sep, 2);
    }

    #[test]
    fn test_internal_split_pushes_middle_up() {
        let mut node: BTreeNode<i32> = BTreeNode::new_internal(INVALID_PAGE_ID);
        node.keys = vec![10, 20, 30];
        node.children = vec![1, 2, 3, 4];
        let (right, push_up) = node.split_internal();
        assert_eq!(push_up, 20);
        assert_eq!(node.keys, vec![10]);
        assert_eq!(node.children, vec![1, 2]);
        assert_eq!(right.keys, vec![30]);
        assert_eq!(right.children, vec![3, 4]);
    }

    #[test]
    fn test_child_index_for() {
        let mut node: BTreeNode<i32> = BTreeNode::new_internal(INVALID_PAGE_ID);
        node.keys = vec![10, 20];
        node.children = vec![1, 2, 3];
        assert_eq!(node.child_index_for(&5), 0);
        assert_eq!(node.child_index_for(&10), 1);
        assert_eq!(node.child_index_for(&15), 1);
        assert_eq!(node.child_index_for(&25), 2);
    }

    #[test]
    fn test_node_page_round_trip() {
        let mut page = Page::new(3);
        let mut node: BTreeNode<i64> = BTreeNode::new_leaf(7);
        node.leaf_insert(42, Rid::new(9, 1));
        node.next_leaf = 12;
        store_node(&node, &mut page).unwrap();

        let loaded: BTreeNode<i64> = load_node(&page).unwrap();
        assert!(loaded.is_leaf);
        assert_eq!(loaded.parent_page_id, 7);
        assert_eq!(loaded.keys, vec![42]);
        assert_eq!(loaded.values, vec![Rid::new(9, 1)]);
        assert_eq!(loaded.next_leaf, 12);
    }
}
