use crate::catalog::Schema;
use crate::execution::{ExecutionError, Executor};
use crate::storage::table::Tuple;

/// Passes rows through until the limit is reached
pub struct LimitExecutor {
    child: Box<dyn Executor>,
    limit: usize,
    count: usize,
}

impl LimitExecutor {
    pub fn new(child: Box<dyn Executor>, limit: usize) -> Self {
        Self {
            child,
            limit,
            count: 0,
        }
    }
}

impl Executor for LimitExecutor {
    fn init(&mut self) -> Result<(), ExecutionError> {
        self.count = 0;
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        if self.count >= self.limit {
            return Ok(None);
        }
        match self.child.next()? {
            Some(tuple) => {
                self.count += 1;
                Ok(Some(tuple))
            }
            None => Ok(None),
        }
    }

    fn output_schema(&self) -> &Schema {
        self.child.output_schema()
    }
}
