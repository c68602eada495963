use crate::catalog::value::DataValue;
use crate::common::types::Rid;

/// A row: schema-typed values, bincode-serialized into a table-page slot.
/// Rows read back from a heap carry the RID they live at.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    values: Vec<DataValue>,
    rid: Option<Rid>,
}

impl Tuple {
    pub fn new(values: Vec<DataValue>) -> Self {
        Self { values, rid: None }
    }

    pub fn with_rid(values: Vec<DataValue>, rid: Rid) -> Self {
        Self {
            values,
            rid: Some(rid),
        }
    }

    pub fn values(&self) -> &[DataValue] {
        &self.values
    }

    pub fn value(&self, index: usize) -> &DataValue {
        &self.values[index]
    }

    pub fn rid(&self) -> Option<Rid> {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = Some(rid);
    }

    /// Pull out the key columns for an index entry
    pub fn key_values(&self, key_attrs: &[usize]) -> Vec<DataValue> {
        key_attrs.iter().map(|&i| self.values[i].clone()).collect()
    }
}
