use std::sync::Arc;

use anyhow::Result;
use tempfile::NamedTempFile;

use loondb::catalog::{Catalog, Column, DataType, DataValue, Schema, TableInfo};
use loondb::execution::ExecutorContext;
use loondb::storage::buffer::BufferPoolManager;
use loondb::transaction::{IsolationLevel, LockManager, Transaction, TransactionManager};

// Quiet by default; RUST_LOG=debug turns the engine's tracing on
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Create a buffer pool manager over a temporary database file
#[allow(dead_code)]
pub fn create_test_buffer_pool(pool_size: usize) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, file.path())?);
    Ok((buffer_pool, file))
}

// A catalog plus a "users" table preloaded with sample rows
#[allow(dead_code)]
pub struct TestDb {
    pub catalog: Arc<Catalog>,
    pub lock_manager: Arc<LockManager>,
    pub txn_manager: Arc<TransactionManager>,
    pub users: Arc<TableInfo>,
    pub _file: NamedTempFile,
}

#[allow(dead_code)]
pub fn users_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", DataType::Integer),
        Column::new("name", DataType::Text),
        Column::new("score", DataType::Float),
    ])
}

#[allow(dead_code)]
pub fn user_row(id: i64, name: &str, score: f64) -> Vec<DataValue> {
    vec![
        DataValue::Integer(id),
        DataValue::Text(name.to_string()),
        DataValue::Float(score),
    ]
}

#[allow(dead_code)]
pub fn create_test_db(rows: &[Vec<DataValue>]) -> Result<TestDb> {
    init_logging();
    let file = NamedTempFile::new()?;
    let buffer_pool = Arc::new(BufferPoolManager::new(64, file.path())?);
    let catalog = Arc::new(Catalog::new(buffer_pool)?);
    let users = catalog.create_table("users", users_schema())?;
    for row in rows {
        users.heap.insert_tuple(row)?;
    }

    let lock_manager = Arc::new(LockManager::new());
    let txn_manager = Arc::new(TransactionManager::new(lock_manager.clone()));

    Ok(TestDb {
        catalog,
        lock_manager,
        txn_manager,
        users,
        _file: file,
    })
}

#[allow(dead_code)]
pub fn context_for(db: &TestDb, isolation: IsolationLevel) -> (ExecutorContext, Arc<Transaction>) {
    let txn = db.txn_manager.begin(isolation);
    let context = ExecutorContext::new(db.catalog.clone(), db.lock_manager.clone(), txn.clone());
    (context, txn)
}
