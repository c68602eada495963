// Schema management
//
// A Schema here is the column layout of one relation: the shape the table
// heap serializes and the executors project through.

use serde::{Deserialize, Serialize};

use crate::catalog::column::Column;

/// Data types supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

/// Column layout of one relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Concatenation of two schemas, as produced by a join
    pub fn join(left: &Schema, right: &Schema) -> Schema {
        let mut columns = left.columns.clone();
        columns.extend(right.columns.iter().cloned());
        Schema::new(columns)
    }

    /// Sub-schema picking out the given column positions (index key schemas)
    pub fn project(&self, attrs: &[usize]) -> Schema {
        Schema::new(attrs.iter().map(|&i| self.columns[i].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::Text),
            Column::new("score", DataType::Float),
        ])
    }

    #[test]
    fn test_column_lookup() {
        let schema = sample();
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
        assert_eq!(schema.column(2).name(), "score");
    }

    #[test]
    fn test_join_concatenates() {
        let left = sample();
        let right = Schema::new(vec![Column::new("order_id", DataType::Integer)]);
        let joined = Schema::join(&left, &right);
        assert_eq!(joined.column_count(), 4);
        assert_eq!(joined.column(3).name(), "order_id");
    }

    #[test]
    fn test_project() {
        let schema = sample();
        let key_schema = schema.project(&[2, 0]);
        assert_eq!(key_schema.column(0).name(), "score");
        assert_eq!(key_schema.column(1).name(), "id");
    }
}
