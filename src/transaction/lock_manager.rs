use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::common::types::{Rid, TxnId, INVALID_TXN_ID};
use crate::transaction::error::{AbortReason, TransactionError};
use crate::transaction::transaction::{IsolationLevel, Transaction, TransactionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

struct LockRequest {
    txn: Arc<Transaction>,
    mode: LockMode,
    granted: bool,
}

/// Per-RID request queue. Requests are FIFO for unrelated transactions;
/// conflicts resolve by age (wound-wait). All queues park on the single
/// table mutex, each with its own condvar. One condvar per queue means a
/// notify wakes every waiter on that row, not just the grantable one;
/// coarse, but every waiter re-checks its predicate before proceeding.
struct LockRequestQueue {
    requests: VecDeque<LockRequest>,
    cv: Arc<Condvar>,
    upgrading: TxnId,
}

impl Default for LockRequestQueue {
    fn default() -> Self {
        Self {
            requests: VecDeque::new(),
            cv: Arc::new(Condvar::new()),
            upgrading: INVALID_TXN_ID,
        }
    }
}

type LockTable = HashMap<Rid, LockRequestQueue>;

/// Row-level S/X lock manager enforcing strict two-phase locking with
/// wound-wait deadlock prevention: an older transaction aborts younger
/// conflicting holders instead of waiting on them.
pub struct LockManager {
    latch: Mutex<LockTable>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            latch: Mutex::new(HashMap::new()),
        }
    }

    /// Take a shared lock on a row. Blocks while older conflicting holders
    /// drain; wounds younger conflicting holders.
    pub fn lock_shared(
        &self,
        txn: &Arc<Transaction>,
        rid: Rid,
    ) -> Result<bool, TransactionError> {
        if txn.state() == TransactionState::Aborted {
            return Ok(false);
        }

        if txn.isolation_level() == IsolationLevel::ReadUncommitted {
            // Dirty readers have no business holding read locks
            txn.set_state(TransactionState::Aborted);
            return Ok(false);
        }

        if txn.state() != TransactionState::Growing {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionError::Abort {
                txn_id: txn.id(),
                reason: AbortReason::LockOnShrinking,
            });
        }

        if txn.is_shared_locked(rid) || txn.is_exclusive_locked(rid) {
            return Ok(true);
        }

        let mut table = self.latch.lock();
        let queue = table.entry(rid).or_default();
        queue.requests.push_back(LockRequest {
            txn: txn.clone(),
            mode: LockMode::Shared,
            granted: false,
        });
        let cv = queue.cv.clone();
        txn.add_shared(rid);

        loop {
            let queue = table.get_mut(&rid).expect("queue vanished under latch");
            let (wait, wounded) = Self::need_wait(txn, queue, LockMode::Shared);
            if wounded {
                cv.notify_all();
            }
            if !wait {
                break;
            }
            cv.wait(&mut table);
            if txn.state() == TransactionState::Aborted {
                Self::drop_request(&mut table, rid, txn.id());
                txn.remove_shared(rid);
                return Err(TransactionError::Abort {
                    txn_id: txn.id(),
                    reason: AbortReason::Deadlock,
                });
            }
        }

        let queue = table.get_mut(&rid).expect("queue vanished under latch");
        for request in queue.requests.iter_mut() {
            if request.txn.id() == txn.id() {
                request.granted = true;
            }
        }
        Ok(true)
    }

    /// Take an exclusive lock on a row
    pub fn lock_exclusive(
        &self,
        txn: &Arc<Transaction>,
        rid: Rid,
    ) -> Result<bool, TransactionError> {
        if txn.state() == TransactionState::Aborted {
            return Ok(false);
        }

        if txn.state() != TransactionState::Growing {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionError::Abort {
                txn_id: txn.id(),
                reason: AbortReason::LockOnShrinking,
            });
        }

        if txn.is_exclusive_locked(rid) {
            return Ok(true);
        }

        let mut table = self.latch.lock();
        let queue = table.entry(rid).or_default();
        queue.requests.push_back(LockRequest {
            txn: txn.clone(),
            mode: LockMode::Exclusive,
            granted: false,
        });
        let cv = queue.cv.clone();
        txn.add_exclusive(rid);

        loop {
            let queue = table.get_mut(&rid).expect("queue vanished under latch");
            let (wait, wounded) = Self::need_wait(txn, queue, LockMode::Exclusive);
            if wounded {
                cv.notify_all();
            }
            if !wait {
                break;
            }
            cv.wait(&mut table);
            if txn.state() == TransactionState::Aborted {
                Self::drop_request(&mut table, rid, txn.id());
                txn.remove_exclusive(rid);
                return Err(TransactionError::Abort {
                    txn_id: txn.id(),
                    reason: AbortReason::Deadlock,
                });
            }
        }

        let queue = table.get_mut(&rid).expect("queue vanished under latch");
        for request in queue.requests.iter_mut() {
            if request.txn.id() == txn.id() {
                request.granted = true;
            }
        }
        Ok(true)
    }

    /// Upgrade a held shared lock to exclusive. Only one upgrade may be in
    /// flight per row; a second one aborts with `UpgradeConflict`.
    pub fn lock_upgrade(
        &self,
        txn: &Arc<Transaction>,
        rid: Rid,
    ) -> Result<bool, TransactionError> {
        if txn.state() == TransactionState::Aborted {
            return Ok(false);
        }

        if txn.state() != TransactionState::Growing {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionError::Abort {
                txn_id: txn.id(),
                reason: AbortReason::UpgradeConflict,
            });
        }

        if txn.is_exclusive_locked(rid) {
            return Ok(true);
        }
        if !txn.is_shared_locked(rid) {
            return Ok(false);
        }

        let mut table = self.latch.lock();
        let queue = table.entry(rid).or_default();
        if queue.upgrading != INVALID_TXN_ID {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionError::Abort {
                txn_id: txn.id(),
                reason: AbortReason::UpgradeConflict,
            });
        }
        queue.upgrading = txn.id();
        let cv = queue.cv.clone();

        loop {
            let queue = table.get_mut(&rid).expect("queue vanished under latch");
            let (wait, wounded) = Self::need_wait_upgrade(txn, queue);
            if wounded {
                cv.notify_all();
            }
            if !wait {
                break;
            }
            cv.wait(&mut table);
            if txn.state() == TransactionState::Aborted {
                let queue = table.get_mut(&rid).expect("queue vanished under latch");
                if queue.upgrading == txn.id() {
                    queue.upgrading = INVALID_TXN_ID;
                }
                Self::drop_request(&mut table, rid, txn.id());
                txn.remove_shared(rid);
                return Err(TransactionError::Abort {
                    txn_id: txn.id(),
                    reason: AbortReason::Deadlock,
                });
            }
        }

        let queue = table.get_mut(&rid).expect("queue vanished under latch");
        for request in queue.requests.iter_mut() {
            if request.txn.id() == txn.id() {
                request.granted = true;
                request.mode = LockMode::Exclusive;
            }
        }
        queue.upgrading = INVALID_TXN_ID;
        txn.remove_shared(rid);
        txn.add_exclusive(rid);
        Ok(true)
    }

    /// Release a held lock: remove the request, notify the queue, and for
    /// REPEATABLE_READ move a growing transaction into its shrinking phase.
    pub fn unlock(&self, txn: &Arc<Transaction>, rid: Rid) -> Result<bool, TransactionError> {
        if !txn.is_shared_locked(rid) && !txn.is_exclusive_locked(rid) {
            return Ok(false);
        }

        let mut table = self.latch.lock();
        let found = match table.get_mut(&rid) {
            Some(queue) => {
                if queue.upgrading == txn.id() {
                    queue.upgrading = INVALID_TXN_ID;
                }
                match queue.requests.iter().position(|r| r.txn.id() == txn.id()) {
                    Some(pos) => {
                        let request = queue.requests.remove(pos).expect("position just found");
                        if request.granted {
                            debug!("txn {} releases its lock on {}", txn.id(), rid);
                        }
                        queue.cv.notify_all();
                        true
                    }
                    None => false,
                }
            }
            None => false,
        };
        drop(table);

        if !found {
            return Ok(false);
        }

        if txn.state() == TransactionState::Growing
            && txn.isolation_level() == IsolationLevel::RepeatableRead
        {
            txn.set_state(TransactionState::Shrinking);
        }
        txn.remove_shared(rid);
        txn.remove_exclusive(rid);
        Ok(true)
    }

    /// Decide whether `txn`'s newest request must keep waiting, wounding
    /// younger conflicting requests ahead of it along the way.
    ///
    /// A shared request proceeds when the queue head is itself or the head
    /// is a shared grant chain; an exclusive request proceeds only from the
    /// head. Waiting is only ever on *older* conflicting requests.
    fn need_wait(
        txn: &Arc<Transaction>,
        queue: &mut LockRequestQueue,
        mode: LockMode,
    ) -> (bool, bool) {
        let self_id = txn.id();

        if let Some(head) = queue.requests.front() {
            let granted_without_wait = match mode {
                LockMode::Shared => head.txn.id() == self_id || head.mode == LockMode::Shared,
                LockMode::Exclusive => head.txn.id() == self_id,
            };
            if granted_without_wait {
                return (false, false);
            }
        }

        let mut need_wait = false;
        let mut wounded = false;
        for request in queue.requests.iter() {
            if request.txn.id() == self_id {
                break;
            }

            if request.txn.id() > self_id {
                // Younger and in the way: wound it
                let conflicts = match mode {
                    LockMode::Shared => request.mode == LockMode::Exclusive,
                    LockMode::Exclusive => true,
                };
                if conflicts && request.txn.state() != TransactionState::Aborted {
                    debug!("txn {} wounds txn {}", self_id, request.txn.id());
                    request.txn.set_state(TransactionState::Aborted);
                    wounded = true;
                }
                continue;
            }

            // Older request ahead of us
            match mode {
                LockMode::Exclusive => need_wait = true,
                LockMode::Shared => {
                    if request.mode == LockMode::Exclusive {
                        need_wait = true;
                    }
                }
            }
        }

        (need_wait, wounded)
    }

    /// Upgrade predicate: the upgrader proceeds only once its request is
    /// the sole one left in the queue. Every younger request is wounded
    /// regardless of mode; older ones are waited out.
    fn need_wait_upgrade(txn: &Arc<Transaction>, queue: &mut LockRequestQueue) -> (bool, bool) {
        let self_id = txn.id();
        let mut need_wait = false;
        let mut wounded = false;

        for request in queue.requests.iter() {
            if request.txn.id() == self_id {
                continue;
            }
            need_wait = true;
            if request.txn.id() > self_id && request.txn.state() != TransactionState::Aborted {
                debug!("txn {} wounds txn {} (upgrade)", self_id, request.txn.id());
                request.txn.set_state(TransactionState::Aborted);
                wounded = true;
            }
        }

        (need_wait, wounded)
    }

    /// Remove a transaction's request from a queue after it noticed it was
    /// wounded, waking the remaining waiters.
    fn drop_request(table: &mut LockTable, rid: Rid, txn_id: TxnId) {
        if let Some(queue) = table.get_mut(&rid) {
            if let Some(pos) = queue.requests.iter().position(|r| r.txn.id() == txn_id) {
                queue.requests.remove(pos);
            }
            queue.cv.notify_all();
        }
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
