use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::types::TxnId;
use crate::transaction::error::TransactionError;
use crate::transaction::lock_manager::LockManager;
use crate::transaction::transaction::{IsolationLevel, Transaction, TransactionState};

/// Creates and tracks transactions, and tears their locks down at
/// commit/abort. Ids are handed out monotonically, so smaller id = older.
pub struct TransactionManager {
    next_txn_id: AtomicU32,
    active_transactions: Mutex<HashMap<TxnId, Arc<Transaction>>>,
    lock_manager: Arc<LockManager>,
}

impl TransactionManager {
    pub fn new(lock_manager: Arc<LockManager>) -> Self {
        Self {
            next_txn_id: AtomicU32::new(0),
            active_transactions: Mutex::new(HashMap::new()),
            lock_manager,
        }
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    /// Begin a new transaction
    pub fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(txn_id, isolation_level));
        self.active_transactions.lock().insert(txn_id, txn.clone());
        txn
    }

    pub fn get_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        self.active_transactions.lock().get(&txn_id).cloned()
    }

    /// Commit: release every held lock and retire the transaction
    pub fn commit(&self, txn: &Arc<Transaction>) -> Result<(), TransactionError> {
        if txn.state() == TransactionState::Aborted {
            return Err(TransactionError::InvalidState(txn.id()));
        }
        txn.set_state(TransactionState::Committed);
        self.release_locks(txn);
        self.active_transactions.lock().remove(&txn.id());
        Ok(())
    }

    /// Abort: mark aborted, release every held lock, retire
    pub fn abort(&self, txn: &Arc<Transaction>) {
        txn.set_state(TransactionState::Aborted);
        self.release_locks(txn);
        self.active_transactions.lock().remove(&txn.id());
    }

    fn release_locks(&self, txn: &Arc<Transaction>) {
        for rid in txn.held_rids() {
            let _ = self.lock_manager.unlock(txn, rid);
        }
    }
}
