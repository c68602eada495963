use std::collections::VecDeque;

use linked_hash_map::LinkedHashMap;

use crate::catalog::{DataValue, Schema};
use crate::execution::{ExecutionError, Executor};
use crate::storage::table::Tuple;

/// Deduplication: init drains the child into a hash table keyed by the full
/// row; next replays the surviving rows in first-seen order.
pub struct DistinctExecutor {
    child: Box<dyn Executor>,
    results: VecDeque<Tuple>,
}

impl DistinctExecutor {
    pub fn new(child: Box<dyn Executor>) -> Self {
        Self {
            child,
            results: VecDeque::new(),
        }
    }
}

impl Executor for DistinctExecutor {
    fn init(&mut self) -> Result<(), ExecutionError> {
        self.child.init()?;
        self.results.clear();

        let mut seen: LinkedHashMap<Vec<DataValue>, Tuple> = LinkedHashMap::new();
        while let Some(tuple) = self.child.next()? {
            let key = tuple.values().to_vec();
            seen.entry(key).or_insert(tuple);
        }
        self.results = seen.into_iter().map(|(_, tuple)| tuple).collect();
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        Ok(self.results.pop_front())
    }

    fn output_schema(&self) -> &Schema {
        self.child.output_schema()
    }
}
