use std::sync::Arc;

use crate::catalog::{DataValue, Schema, TableInfo, TableOid};
use crate::execution::context::ExecutorContext;
use crate::execution::{abort_error, ExecutionError, Executor};
use crate::index::IndexKey;
use crate::storage::table::Tuple;
use crate::transaction::IsolationLevel;

/// Appends rows to a table, either from a literal value list or from a
/// child executor, maintaining every index declared over the table. Emits
/// no rows; the first `next()` does all the work.
///
/// Each new row is X-locked (upgrading when an S lock is already held) and
/// the lock is dropped again for isolation levels below REPEATABLE_READ.
pub struct InsertExecutor {
    context: ExecutorContext,
    table: Arc<TableInfo>,
    raw_values: Vec<Vec<DataValue>>,
    cursor: usize,
    child: Option<Box<dyn Executor>>,
    done: bool,
}

impl InsertExecutor {
    /// Raw insert of literal rows
    pub fn new_raw(
        context: ExecutorContext,
        table_oid: TableOid,
        rows: Vec<Vec<DataValue>>,
    ) -> Result<Self, ExecutionError> {
        let table = context
            .catalog
            .get_table(table_oid)
            .ok_or_else(|| ExecutionError::TableNotFound(format!("oid {}", table_oid)))?;
        Ok(Self {
            context,
            table,
            raw_values: rows,
            cursor: 0,
            child: None,
            done: false,
        })
    }

    /// Insert-from-select: rows come from a child pipeline
    pub fn new_from_child(
        context: ExecutorContext,
        table_oid: TableOid,
        child: Box<dyn Executor>,
    ) -> Result<Self, ExecutionError> {
        let table = context
            .catalog
            .get_table(table_oid)
            .ok_or_else(|| ExecutionError::TableNotFound(format!("oid {}", table_oid)))?;
        Ok(Self {
            context,
            table,
            raw_values: Vec::new(),
            cursor: 0,
            child: Some(child),
            done: false,
        })
    }

    fn next_source_row(&mut self) -> Result<Option<Vec<DataValue>>, ExecutionError> {
        match &mut self.child {
            Some(child) => Ok(child.next()?.map(|tuple| tuple.values().to_vec())),
            None => {
                if self.cursor >= self.raw_values.len() {
                    return Ok(None);
                }
                let row = self.raw_values[self.cursor].clone();
                self.cursor += 1;
                Ok(Some(row))
            }
        }
    }

    fn insert_row(&self, values: &[DataValue]) -> Result<(), ExecutionError> {
        let rid = self.table.heap.insert_tuple(values)?;

        let txn = &self.context.transaction;
        let lock_manager = &self.context.lock_manager;

        let locked = if txn.is_shared_locked(rid) {
            lock_manager.lock_upgrade(txn, rid)?
        } else {
            lock_manager.lock_exclusive(txn, rid)?
        };
        if !locked {
            return Err(abort_error(txn));
        }

        let tuple = Tuple::with_rid(values.to_vec(), rid);
        for index_info in self.context.catalog.get_table_indexes(&self.table.name) {
            let key = IndexKey::from_values(tuple.key_values(&index_info.key_attrs));
            index_info.index.insert(key, rid)?;
        }

        if txn.isolation_level() != IsolationLevel::RepeatableRead
            && !lock_manager.unlock(txn, rid)?
        {
            return Err(abort_error(txn));
        }
        Ok(())
    }
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> Result<(), ExecutionError> {
        self.done = false;
        self.cursor = 0;
        if let Some(child) = &mut self.child {
            child.init()?;
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        if self.done {
            return Ok(None);
        }

        while let Some(values) = self.next_source_row()? {
            self.insert_row(&values)?;
        }
        self.done = true;
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.table.schema
    }
}
