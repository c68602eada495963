use std::sync::Arc;

use thiserror::Error;

use crate::catalog::value::DataValue;
use crate::common::types::{PageId, Rid, INVALID_PAGE_ID};
use crate::storage::buffer::{BufferPoolError, BufferPoolManager};
use crate::storage::page::layout::MAX_RECORD_SIZE;
use crate::storage::page::{PageError, PageManager};
use crate::storage::table::iterator::TableIterator;
use crate::storage::table::tuple::Tuple;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),

    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Tuple of {0} bytes exceeds page capacity")]
    TupleTooLarge(usize),

    #[error("Tuple serialization failed: {0}")]
    Serialization(String),
}

/// Row storage for one table: a forward-linked chain of slotted pages.
/// Rows are bincode-serialized value vectors; a row's RID is stable until
/// the row is deleted.
pub struct TableHeap {
    buffer_pool: Arc<BufferPoolManager>,
    page_manager: PageManager,
    first_page_id: PageId,
}

impl TableHeap {
    /// Create a heap with one fresh, empty page
    pub fn create(buffer_pool: Arc<BufferPoolManager>) -> Result<Self, TableError> {
        let page_manager = PageManager::new();
        let (page, first_page_id) = buffer_pool.new_page()?;
        page_manager.init_page(&mut page.write());
        buffer_pool.unpin_page(first_page_id, true);

        Ok(Self {
            buffer_pool,
            page_manager,
            first_page_id,
        })
    }

    /// Reattach to an existing chain
    pub fn open(buffer_pool: Arc<BufferPoolManager>, first_page_id: PageId) -> Self {
        Self {
            buffer_pool,
            page_manager: PageManager::new(),
            first_page_id,
        }
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.buffer_pool
    }

    /// Append a row, extending the chain when the tail page is full
    pub fn insert_tuple(&self, values: &[DataValue]) -> Result<Rid, TableError> {
        let bytes = bincode::serialize(values)
            .map_err(|e| TableError::Serialization(e.to_string()))?;
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(TableError::TupleTooLarge(bytes.len()));
        }

        let mut page_id = self.first_page_id;
        loop {
            let page = self.buffer_pool.fetch_page(page_id)?;
            let mut guard = page.write();

            match self.page_manager.insert_record(&mut guard, &bytes) {
                Ok(slot) => {
                    drop(guard);
                    self.buffer_pool.unpin_page(page_id, true);
                    return Ok(Rid::new(page_id, slot));
                }
                Err(PageError::InsufficientSpace) => {
                    let next = self.page_manager.next_page_id(&guard);
                    if next != INVALID_PAGE_ID {
                        drop(guard);
                        self.buffer_pool.unpin_page(page_id, false);
                        page_id = next;
                        continue;
                    }

                    // Tail page: grow the chain
                    let (new_page, new_page_id) = self.buffer_pool.new_page()?;
                    {
                        let mut new_guard = new_page.write();
                        self.page_manager.init_page(&mut new_guard);
                        let slot = self.page_manager.insert_record(&mut new_guard, &bytes)?;
                        self.page_manager.set_next_page_id(&mut guard, new_page_id);
                        drop(new_guard);
                        drop(guard);
                        self.buffer_pool.unpin_page(page_id, true);
                        self.buffer_pool.unpin_page(new_page_id, true);
                        return Ok(Rid::new(new_page_id, slot));
                    }
                }
                Err(e) => {
                    drop(guard);
                    self.buffer_pool.unpin_page(page_id, false);
                    return Err(e.into());
                }
            }
        }
    }

    /// Read a row; `None` if it has been deleted
    pub fn get_tuple(&self, rid: Rid) -> Result<Option<Tuple>, TableError> {
        let page = self.buffer_pool.fetch_page(rid.page_id)?;
        let result = {
            let guard = page.read();
            self.page_manager.get_record(&guard, rid.slot)
        };
        self.buffer_pool.unpin_page(rid.page_id, false);

        match result? {
            Some(bytes) => {
                let values: Vec<DataValue> = bincode::deserialize(&bytes)
                    .map_err(|e| TableError::Serialization(e.to_string()))?;
                Ok(Some(Tuple::with_rid(values, rid)))
            }
            None => Ok(None),
        }
    }

    /// Tombstone a row. Returns false if it was already gone.
    pub fn delete_tuple(&self, rid: Rid) -> Result<bool, TableError> {
        let page = self.buffer_pool.fetch_page(rid.page_id)?;
        let result = {
            let mut guard = page.write();
            self.page_manager.delete_record(&mut guard, rid.slot)
        };

        match result {
            Ok(()) => {
                self.buffer_pool.unpin_page(rid.page_id, true);
                Ok(true)
            }
            Err(PageError::RecordNotFound) => {
                self.buffer_pool.unpin_page(rid.page_id, false);
                Ok(false)
            }
            Err(e) => {
                self.buffer_pool.unpin_page(rid.page_id, false);
                Err(e.into())
            }
        }
    }

    /// Rewrite a row in place, keeping its RID
    pub fn update_tuple(&self, rid: Rid, values: &[DataValue]) -> Result<bool, TableError> {
        let bytes = bincode::serialize(values)
            .map_err(|e| TableError::Serialization(e.to_string()))?;

        let page = self.buffer_pool.fetch_page(rid.page_id)?;
        let result = {
            let mut guard = page.write();
            self.page_manager.update_record(&mut guard, rid.slot, &bytes)
        };

        match result {
            Ok(()) => {
                self.buffer_pool.unpin_page(rid.page_id, true);
                Ok(true)
            }
            Err(PageError::RecordNotFound) => {
                self.buffer_pool.unpin_page(rid.page_id, false);
                Ok(false)
            }
            Err(e) => {
                self.buffer_pool.unpin_page(rid.page_id, false);
                Err(e.into())
            }
        }
    }

    pub fn iter(self: &Arc<Self>) -> TableIterator {
        TableIterator::new(self.clone())
    }

    pub(crate) fn page_manager(&self) -> &PageManager {
        &self.page_manager
    }
}
