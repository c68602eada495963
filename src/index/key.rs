use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::catalog::value::DataValue;

/// Composite key built from a tuple's key columns.
///
/// Wraps the value vector to give it the total order the B+ tree needs
/// (floats via `total_cmp`, types ranked before values) while staying
/// hashable for the hash index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexKey(pub Vec<DataValue>);

impl IndexKey {
    pub fn from_values(values: Vec<DataValue>) -> Self {
        Self(values)
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.total_cmp(b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_order() {
        let a = IndexKey(vec![DataValue::Integer(1), DataValue::Integer(5)]);
        let b = IndexKey(vec![DataValue::Integer(1), DataValue::Integer(9)]);
        let c = IndexKey(vec![DataValue::Integer(2), DataValue::Integer(0)]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_prefix_sorts_first() {
        let short = IndexKey(vec![DataValue::Integer(1)]);
        let long = IndexKey(vec![DataValue::Integer(1), DataValue::Integer(0)]);
        assert!(short < long);
    }
}
