use std::collections::VecDeque;

use crate::catalog::Schema;
use crate::execution::expression::Expression;
use crate::execution::{ExecutionError, Executor};
use crate::storage::table::Tuple;

/// Nested loop join: for each left row, rewind and stream the right side,
/// queueing every pair the predicate accepts. Output rows are the
/// concatenation of both sides.
pub struct NestedLoopJoinExecutor {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    predicate: Option<Expression>,
    output_schema: Schema,
    queue: VecDeque<Tuple>,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        predicate: Option<Expression>,
    ) -> Self {
        let output_schema = Schema::join(left.output_schema(), right.output_schema());
        Self {
            left,
            right,
            predicate,
            output_schema,
            queue: VecDeque::new(),
        }
    }

    fn join_tuple(left: &Tuple, right: &Tuple) -> Tuple {
        let mut values = left.values().to_vec();
        values.extend(right.values().iter().cloned());
        Tuple::new(values)
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> Result<(), ExecutionError> {
        self.queue.clear();
        self.left.init()
    }

    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        loop {
            if let Some(tuple) = self.queue.pop_front() {
                return Ok(Some(tuple));
            }

            let left_tuple = match self.left.next()? {
                Some(tuple) => tuple,
                None => return Ok(None),
            };

            self.right.init()?;
            while let Some(right_tuple) = self.right.next()? {
                let matches = match &self.predicate {
                    Some(predicate) => predicate
                        .evaluate_join(
                            &left_tuple,
                            self.left.output_schema(),
                            &right_tuple,
                            self.right.output_schema(),
                        )?
                        .is_true(),
                    None => true,
                };
                if matches {
                    self.queue
                        .push_back(Self::join_tuple(&left_tuple, &right_tuple));
                }
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
