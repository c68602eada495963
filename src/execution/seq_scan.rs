use std::sync::Arc;

use crate::catalog::{Schema, TableInfo, TableOid};
use crate::execution::context::ExecutorContext;
use crate::execution::expression::Expression;
use crate::execution::{abort_error, ExecutionError, Executor};
use crate::storage::table::{TableIterator, Tuple};
use crate::transaction::IsolationLevel;

/// Full table scan with an optional predicate.
///
/// Row locking follows the isolation level: READ_UNCOMMITTED takes nothing,
/// READ_COMMITTED takes S and drops it before emitting, REPEATABLE_READ
/// takes S and keeps it for two-phase locking.
pub struct SeqScanExecutor {
    context: ExecutorContext,
    table: Arc<TableInfo>,
    predicate: Option<Expression>,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(
        context: ExecutorContext,
        table_oid: TableOid,
        predicate: Option<Expression>,
    ) -> Result<Self, ExecutionError> {
        let table = context
            .catalog
            .get_table(table_oid)
            .ok_or_else(|| ExecutionError::TableNotFound(format!("oid {}", table_oid)))?;
        Ok(Self {
            context,
            table,
            predicate,
            iter: None,
        })
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> Result<(), ExecutionError> {
        self.iter = Some(self.table.heap.iter());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        if self.iter.is_none() {
            self.init()?;
        }

        loop {
            let tuple = match self.iter.as_mut().expect("scan not initialized").next()? {
                Some(tuple) => tuple,
                None => return Ok(None),
            };
            let rid = tuple.rid().expect("heap tuples carry rids");

            let txn = &self.context.transaction;
            let lock_manager = &self.context.lock_manager;
            let isolation = txn.isolation_level();

            if isolation != IsolationLevel::ReadUncommitted
                && !lock_manager.lock_shared(txn, rid)?
            {
                return Err(abort_error(txn));
            }

            let passes = match &self.predicate {
                Some(predicate) => predicate.evaluate(&tuple, &self.table.schema)?.is_true(),
                None => true,
            };

            if isolation == IsolationLevel::ReadCommitted
                && !lock_manager.unlock(txn, rid)?
            {
                return Err(abort_error(txn));
            }

            if passes {
                return Ok(Some(tuple));
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.table.schema
    }
}
