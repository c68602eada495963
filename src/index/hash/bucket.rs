use serde::{Deserialize, Serialize};

/// State of one bucket slot. A tombstone keeps its position for probing
/// purposes but is reusable by inserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Slot<K, V> {
    Vacant,
    Tombstone,
    Occupied(K, V),
}

/// Fixed-capacity bucket, serialized whole into its page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket<K, V> {
    pub slots: Vec<Slot<K, V>>,
}

impl<K, V> Bucket<K, V>
where
    K: Clone + Eq,
    V: Clone + Eq,
{
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(Slot::Vacant);
        }
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Every value stored under `key`
    pub fn get_all(&self, key: &K) -> Vec<V> {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Occupied(k, v) if k == key => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, key: &K, value: &V) -> bool {
        self.slots
            .iter()
            .any(|slot| matches!(slot, Slot::Occupied(k, v) if k == key && v == value))
    }

    /// Place a pair in the first dead or vacant slot; false when full
    pub fn insert(&mut self, key: K, value: V) -> bool {
        for slot in self.slots.iter_mut() {
            if matches!(slot, Slot::Vacant | Slot::Tombstone) {
                *slot = Slot::Occupied(key, value);
                return true;
            }
        }
        false
    }

    /// Tombstone the matching pair; false if absent
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        for slot in self.slots.iter_mut() {
            if matches!(slot, Slot::Occupied(k, v) if k == key && v == value) {
                *slot = Slot::Tombstone;
                return true;
            }
        }
        false
    }

    /// No live slot left to insert into
    pub fn is_full(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| matches!(slot, Slot::Occupied(_, _)))
    }

    /// No live entries at all
    pub fn is_empty(&self) -> bool {
        !self
            .slots
            .iter()
            .any(|slot| matches!(slot, Slot::Occupied(_, _)))
    }

    /// Pull out every live pair and reset the bucket (used on split)
    pub fn drain_entries(&mut self) -> Vec<(K, V)> {
        let mut entries = Vec::new();
        for slot in self.slots.iter_mut() {
            if let Slot::Occupied(k, v) = std::mem::replace(slot, Slot::Vacant) {
                entries.push((k, v));
            } else {
                *slot = Slot::Vacant;
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_until_full() {
        let mut bucket: Bucket<i32, i32> = Bucket::new(2);
        assert!(bucket.insert(1, 10));
        assert!(bucket.insert(2, 20));
        assert!(bucket.is_full());
        assert!(!bucket.insert(3, 30));
    }

    #[test]
    fn test_remove_leaves_reusable_tombstone() {
        let mut bucket: Bucket<i32, i32> = Bucket::new(2);
        bucket.insert(1, 10);
        bucket.insert(2, 20);
        assert!(bucket.remove(&1, &10));
        assert!(!bucket.remove(&1, &10));
        assert!(!bucket.is_full());
        assert!(bucket.insert(3, 30));
        assert_eq!(bucket.get_all(&3), vec![30]);
    }

    #[test]
    fn test_same_key_many_values() {
        let mut bucket: Bucket<i32, i32> = Bucket::new(4);
        bucket.insert(1, 10);
        bucket.insert(1, 11);
        let mut values = bucket.get_all(&1);
        values.sort();
        assert_eq!(values, vec![10, 11]);
        assert!(bucket.contains(&1, &11));
    }

    #[test]
    fn test_drain_resets() {
        let mut bucket: Bucket<i32, i32> = Bucket::new(3);
        bucket.insert(1, 10);
        bucket.insert(2, 20);
        bucket.remove(&2, &20);
        let entries = bucket.drain_entries();
        assert_eq!(entries, vec![(1, 10)]);
        assert!(bucket.is_empty());
        assert!(!bucket.is_full());
    }
}
