// Export public modules
pub mod catalog;
pub mod common;
pub mod execution;
pub mod index;
pub mod storage;
pub mod transaction;

// Re-export key items for convenient access
pub use catalog::Catalog;
pub use index::btree::BPlusTree;
pub use index::hash::ExtendibleHashTable;
pub use storage::buffer::{BufferPoolError, BufferPoolManager, StripedBufferPoolManager};
pub use storage::page::PageManager;
pub use transaction::{LockManager, Transaction, TransactionManager};
