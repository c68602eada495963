// Typed values
//
// The value model shared by the table heap, the indexes, and the executors.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::catalog::schema::DataType;

/// Possible data types for values in a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Type discriminant first to avoid collisions between types
        match self {
            DataValue::Null => {
                0.hash(state);
            }
            DataValue::Integer(i) => {
                1.hash(state);
                i.hash(state);
            }
            DataValue::Float(f) => {
                2.hash(state);
                f.to_bits().hash(state);
            }
            DataValue::Text(s) => {
                3.hash(state);
                s.hash(state);
            }
            DataValue::Boolean(b) => {
                4.hash(state);
                b.hash(state);
            }
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "\"{}\"", s),
            DataValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            // Null is incomparable with anything
            (DataValue::Null, _) | (_, DataValue::Null) => None,

            (DataValue::Integer(a), DataValue::Integer(b)) => a.partial_cmp(b),
            (DataValue::Float(a), DataValue::Float(b)) => a.partial_cmp(b),

            // Integer and float can be compared
            (DataValue::Integer(a), DataValue::Float(b)) => (*a as f64).partial_cmp(b),
            (DataValue::Float(a), DataValue::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (DataValue::Text(a), DataValue::Text(b)) => a.partial_cmp(b),
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a.partial_cmp(b),

            _ => None,
        }
    }
}

impl DataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    pub fn data_type(&self) -> Option<DataType> {
        match self {
            DataValue::Null => None,
            DataValue::Integer(_) => Some(DataType::Integer),
            DataValue::Float(_) => Some(DataType::Float),
            DataValue::Text(_) => Some(DataType::Text),
            DataValue::Boolean(_) => Some(DataType::Boolean),
        }
    }

    /// Truthiness for predicate results: only Boolean(true) passes
    pub fn is_true(&self) -> bool {
        matches!(self, DataValue::Boolean(true))
    }

    /// Numeric addition for aggregate accumulation; `None` for non-numeric
    /// operands. Null absorbs nothing here, the accumulator skips it.
    pub fn checked_add(&self, other: &DataValue) -> Option<DataValue> {
        match (self, other) {
            (DataValue::Integer(a), DataValue::Integer(b)) => Some(DataValue::Integer(a + b)),
            (DataValue::Float(a), DataValue::Float(b)) => Some(DataValue::Float(a + b)),
            (DataValue::Integer(a), DataValue::Float(b)) => Some(DataValue::Float(*a as f64 + b)),
            (DataValue::Float(a), DataValue::Integer(b)) => Some(DataValue::Float(a + *b as f64)),
            _ => None,
        }
    }

    /// A total order usable for index keys: values rank by type first
    /// (Null < Boolean < Integer ~ Float < Text), then naturally within a
    /// type, with floats ordered by `total_cmp`.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &DataValue) -> u8 {
            match v {
                DataValue::Null => 0,
                DataValue::Boolean(_) => 1,
                DataValue::Integer(_) | DataValue::Float(_) => 2,
                DataValue::Text(_) => 3,
            }
        }

        match (self, other) {
            (DataValue::Integer(a), DataValue::Integer(b)) => a.cmp(b),
            (DataValue::Float(a), DataValue::Float(b)) => a.total_cmp(b),
            (DataValue::Integer(a), DataValue::Float(b)) => (*a as f64).total_cmp(b),
            (DataValue::Float(a), DataValue::Integer(b)) => a.total_cmp(&(*b as f64)),
            (DataValue::Text(a), DataValue::Text(b)) => a.cmp(b),
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a.cmp(b),
            (DataValue::Null, DataValue::Null) => Ordering::Equal,
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_numeric_comparison() {
        assert_eq!(
            DataValue::Integer(2).partial_cmp(&DataValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            DataValue::Float(3.0).partial_cmp(&DataValue::Integer(3)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_null_is_incomparable() {
        assert_eq!(DataValue::Null.partial_cmp(&DataValue::Integer(1)), None);
        assert!(!DataValue::Null.is_true());
    }

    #[test]
    fn test_total_cmp_is_total() {
        let values = [
            DataValue::Null,
            DataValue::Boolean(false),
            DataValue::Integer(-1),
            DataValue::Float(f64::NAN),
            DataValue::Text("a".to_string()),
        ];
        for a in &values {
            for b in &values {
                // Must never panic, and must be antisymmetric
                let ab = a.total_cmp(b);
                let ba = b.total_cmp(a);
                assert_eq!(ab, ba.reverse());
            }
        }
    }

    #[test]
    fn test_checked_add() {
        assert_eq!(
            DataValue::Integer(2).checked_add(&DataValue::Integer(3)),
            Some(DataValue::Integer(5))
        );
        assert_eq!(
            DataValue::Integer(2).checked_add(&DataValue::Float(0.5)),
            Some(DataValue::Float(2.5))
        );
        assert_eq!(
            DataValue::Text("x".to_string()).checked_add(&DataValue::Integer(1)),
            None
        );
    }
}
