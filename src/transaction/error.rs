use thiserror::Error;

use crate::common::types::TxnId;

/// Why a transaction was aborted by the lock manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Deadlock,
    LockOnShrinking,
    UpgradeConflict,
}

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction {txn_id} aborted: {reason:?}")]
    Abort { txn_id: TxnId, reason: AbortReason },

    #[error("Transaction {0} is no longer active")]
    InvalidState(TxnId),

    #[error("Transaction {0} not found")]
    NotFound(TxnId),
}
