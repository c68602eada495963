// Volcano execution
//
// Pull-based operators: each exposes init/next and owns its children.
// A failed next() carries the error up and terminates the pipeline; the
// driver is responsible for aborting the transaction.

pub mod aggregation;
pub mod context;
pub mod distinct;
pub mod expression;
pub mod hash_join;
pub mod insert;
pub mod limit;
pub mod nested_loop_join;
pub mod seq_scan;

use thiserror::Error;

use crate::catalog::Schema;
use crate::common::types::TxnId;
use crate::index::IndexError;
use crate::storage::table::{TableError, Tuple};
use crate::transaction::error::{AbortReason, TransactionError};
use crate::transaction::Transaction;

pub use aggregation::{AggregationExecutor, AggregationType};
pub use context::ExecutorContext;
pub use distinct::DistinctExecutor;
pub use expression::{ComparisonOp, Expression, LogicOp};
pub use hash_join::HashJoinExecutor;
pub use insert::InsertExecutor;
pub use limit::LimitExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use seq_scan::SeqScanExecutor;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Transaction {0} was aborted")]
    Aborted(TxnId),

    #[error("Expression error: {0}")]
    Expression(String),
}

/// The volcano operator interface
pub trait Executor: Send {
    /// Prepare (or rewind) the operator before pulling rows
    fn init(&mut self) -> Result<(), ExecutionError>;

    /// Produce the next row, or `None` when exhausted
    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError>;

    /// Shape of the rows this operator emits
    fn output_schema(&self) -> &Schema;
}

/// A lock call came back false: the transaction was wounded or is otherwise
/// dead. Surface it the way the lock manager reports deadlocks.
pub(crate) fn abort_error(txn: &Transaction) -> ExecutionError {
    ExecutionError::Transaction(TransactionError::Abort {
        txn_id: txn.id(),
        reason: AbortReason::Deadlock,
    })
}
