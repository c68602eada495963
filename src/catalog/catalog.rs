// Catalog
//
// Descriptors for tables and indexes. Built up before execution starts and
// treated as read-only while queries run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::catalog::schema::Schema;
use crate::common::types::Rid;
use crate::index::btree::{BPlusTree, BTreeError};
use crate::index::hash::{ExtendibleHashTable, HashIndexError, DEFAULT_BUCKET_CAPACITY};
use crate::index::{IndexError, IndexKey};
use crate::storage::buffer::{BufferPoolError, BufferPoolManager};
use crate::storage::table::{TableError, TableHeap};

pub type TableOid = u32;
pub type IndexOid = u32;

/// Default fanout for catalog-created B+ tree indexes, counted in keys
const DEFAULT_LEAF_MAX: usize = 32;
const DEFAULT_INTERNAL_MAX: usize = 32;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Index {0} already exists")]
    IndexExists(String),

    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Index error: {0}")]
    BTree(#[from] BTreeError),

    #[error("Index error: {0}")]
    Hash(#[from] HashIndexError),
}

/// One table: its schema and the heap its rows live in
pub struct TableInfo {
    pub oid: TableOid,
    pub name: String,
    pub schema: Schema,
    pub heap: Arc<TableHeap>,
}

/// A concrete index instance, either flavor
pub enum IndexHandle {
    BTree(Arc<BPlusTree<IndexKey>>),
    Hash(Arc<ExtendibleHashTable<IndexKey, Rid>>),
}

impl IndexHandle {
    pub fn insert(&self, key: IndexKey, rid: Rid) -> Result<bool, IndexError> {
        match self {
            IndexHandle::BTree(tree) => Ok(tree.insert(key, rid)?),
            IndexHandle::Hash(table) => Ok(table.insert(key, rid)?),
        }
    }

    pub fn remove(&self, key: &IndexKey, rid: Rid) -> Result<(), IndexError> {
        match self {
            IndexHandle::BTree(tree) => Ok(tree.remove(key)?),
            IndexHandle::Hash(table) => {
                table.remove(key, &rid)?;
                Ok(())
            }
        }
    }

    /// Every RID stored under the key
    pub fn scan(&self, key: &IndexKey) -> Result<Vec<Rid>, IndexError> {
        match self {
            IndexHandle::BTree(tree) => Ok(tree.search(key)?),
            IndexHandle::Hash(table) => Ok(table.get(key)?),
        }
    }
}

/// One index over a table: which columns it keys on and the handle itself
pub struct IndexInfo {
    pub oid: IndexOid,
    pub name: String,
    pub table_name: String,
    pub key_schema: Schema,
    pub key_attrs: Vec<usize>,
    pub index: IndexHandle,
}

struct CatalogInner {
    tables: HashMap<TableOid, Arc<TableInfo>>,
    table_names: HashMap<String, TableOid>,
    indexes: HashMap<IndexOid, Arc<IndexInfo>>,
    table_indexes: HashMap<String, Vec<IndexOid>>,
}

pub struct Catalog {
    buffer_pool: Arc<BufferPoolManager>,
    inner: RwLock<CatalogInner>,
    next_table_oid: AtomicU32,
    next_index_oid: AtomicU32,
}

impl Catalog {
    pub fn new(buffer_pool: Arc<BufferPoolManager>) -> Result<Self, CatalogError> {
        buffer_pool.ensure_header_page()?;
        Ok(Self {
            buffer_pool,
            inner: RwLock::new(CatalogInner {
                tables: HashMap::new(),
                table_names: HashMap::new(),
                indexes: HashMap::new(),
                table_indexes: HashMap::new(),
            }),
            next_table_oid: AtomicU32::new(0),
            next_index_oid: AtomicU32::new(0),
        })
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.buffer_pool
    }

    pub fn create_table(
        &self,
        name: impl Into<String>,
        schema: Schema,
    ) -> Result<Arc<TableInfo>, CatalogError> {
        let name = name.into();
        {
            let inner = self.inner.read();
            if inner.table_names.contains_key(&name) {
                return Err(CatalogError::TableExists(name));
            }
        }

        let heap = Arc::new(TableHeap::create(self.buffer_pool.clone())?);
        let oid = self.next_table_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(TableInfo {
            oid,
            name: name.clone(),
            schema,
            heap,
        });

        let mut inner = self.inner.write();
        inner.tables.insert(oid, info.clone());
        inner.table_names.insert(name.clone(), oid);
        inner.table_indexes.entry(name).or_default();
        Ok(info)
    }

    pub fn get_table(&self, oid: TableOid) -> Option<Arc<TableInfo>> {
        self.inner.read().tables.get(&oid).cloned()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        let inner = self.inner.read();
        let oid = inner.table_names.get(name)?;
        inner.tables.get(oid).cloned()
    }

    /// Create a B+ tree index keyed on `key_attrs` (column positions)
    pub fn create_btree_index(
        &self,
        name: impl Into<String>,
        table_name: &str,
        key_attrs: Vec<usize>,
    ) -> Result<Arc<IndexInfo>, CatalogError> {
        let name = name.into();
        let table = self
            .get_table_by_name(table_name)
            .ok_or_else(|| CatalogError::TableNotFound(table_name.to_string()))?;
        self.check_index_name(&name)?;

        let tree = Arc::new(BPlusTree::new(
            name.clone(),
            self.buffer_pool.clone(),
            DEFAULT_LEAF_MAX,
            DEFAULT_INTERNAL_MAX,
        )?);
        self.register_index(
            name,
            table_name,
            key_attrs,
            &table.schema,
            IndexHandle::BTree(tree),
        )
    }

    /// Create an extendible hash index keyed on `key_attrs`
    pub fn create_hash_index(
        &self,
        name: impl Into<String>,
        table_name: &str,
        key_attrs: Vec<usize>,
    ) -> Result<Arc<IndexInfo>, CatalogError> {
        let name = name.into();
        let table = self
            .get_table_by_name(table_name)
            .ok_or_else(|| CatalogError::TableNotFound(table_name.to_string()))?;
        self.check_index_name(&name)?;

        let hash = Arc::new(ExtendibleHashTable::new(
            name.clone(),
            self.buffer_pool.clone(),
            DEFAULT_BUCKET_CAPACITY,
        )?);
        self.register_index(
            name,
            table_name,
            key_attrs,
            &table.schema,
            IndexHandle::Hash(hash),
        )
    }

    pub fn get_index(&self, oid: IndexOid) -> Option<Arc<IndexInfo>> {
        self.inner.read().indexes.get(&oid).cloned()
    }

    /// Every index declared over a table
    pub fn get_table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        let inner = self.inner.read();
        inner
            .table_indexes
            .get(table_name)
            .map(|oids| {
                oids.iter()
                    .filter_map(|oid| inner.indexes.get(oid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_index_name(&self, name: &str) -> Result<(), CatalogError> {
        let inner = self.inner.read();
        if inner.indexes.values().any(|info| info.name == name) {
            return Err(CatalogError::IndexExists(name.to_string()));
        }
        Ok(())
    }

    fn register_index(
        &self,
        name: String,
        table_name: &str,
        key_attrs: Vec<usize>,
        table_schema: &Schema,
        index: IndexHandle,
    ) -> Result<Arc<IndexInfo>, CatalogError> {
        let oid = self.next_index_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(IndexInfo {
            oid,
            name,
            table_name: table_name.to_string(),
            key_schema: table_schema.project(&key_attrs),
            key_attrs,
            index,
        });

        let mut inner = self.inner.write();
        inner.indexes.insert(oid, info.clone());
        inner
            .table_indexes
            .entry(table_name.to_string())
            .or_default()
            .push(oid);
        Ok(info)
    }
}
