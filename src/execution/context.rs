use std::sync::Arc;

use crate::catalog::Catalog;
use crate::transaction::{LockManager, Transaction};

/// Everything an executor needs from its surroundings: the catalog for
/// descriptors, the lock manager for row locks, and the driving transaction.
#[derive(Clone)]
pub struct ExecutorContext {
    pub catalog: Arc<Catalog>,
    pub lock_manager: Arc<LockManager>,
    pub transaction: Arc<Transaction>,
}

impl ExecutorContext {
    pub fn new(
        catalog: Arc<Catalog>,
        lock_manager: Arc<LockManager>,
        transaction: Arc<Transaction>,
    ) -> Self {
        Self {
            catalog,
            lock_manager,
            transaction,
        }
    }
}
