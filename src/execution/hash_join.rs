use std::collections::{HashMap, VecDeque};

use crate::catalog::{DataValue, Schema};
use crate::execution::expression::Expression;
use crate::execution::{ExecutionError, Executor};
use crate::storage::table::Tuple;

/// Equi-join via hashing: init drains the left child into a multimap keyed
/// by the left join expression; next probes with right rows and queues one
/// joined row per left match.
pub struct HashJoinExecutor {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    left_key: Expression,
    right_key: Expression,
    output_schema: Schema,
    build_table: HashMap<DataValue, Vec<Tuple>>,
    queue: VecDeque<Tuple>,
}

impl HashJoinExecutor {
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        left_key: Expression,
        right_key: Expression,
    ) -> Self {
        let output_schema = Schema::join(left.output_schema(), right.output_schema());
        Self {
            left,
            right,
            left_key,
            right_key,
            output_schema,
            build_table: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    fn join_tuple(left: &Tuple, right: &Tuple) -> Tuple {
        let mut values = left.values().to_vec();
        values.extend(right.values().iter().cloned());
        Tuple::new(values)
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> Result<(), ExecutionError> {
        self.left.init()?;
        self.right.init()?;
        self.build_table.clear();
        self.queue.clear();

        // Build phase: the whole left side goes into the hash table
        while let Some(tuple) = self.left.next()? {
            let key = self.left_key.evaluate(&tuple, self.left.output_schema())?;
            self.build_table.entry(key).or_default().push(tuple);
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        loop {
            if let Some(tuple) = self.queue.pop_front() {
                return Ok(Some(tuple));
            }

            let right_tuple = match self.right.next()? {
                Some(tuple) => tuple,
                None => return Ok(None),
            };

            let key = self
                .right_key
                .evaluate(&right_tuple, self.right.output_schema())?;
            if let Some(matches) = self.build_table.get(&key) {
                for left_tuple in matches {
                    self.queue
                        .push_back(Self::join_tuple(left_tuple, &right_tuple));
                }
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
