use std::sync::Arc;

use crate::common::types::{PageId, Rid, INVALID_PAGE_ID};
use crate::storage::table::heap::{TableError, TableHeap};
use crate::storage::table::tuple::Tuple;

/// Forward scan over a table heap's page chain, skipping tombstoned slots.
/// The iterator re-fetches its page per call rather than holding a pin
/// across calls.
pub struct TableIterator {
    heap: Arc<TableHeap>,
    page_id: PageId,
    slot: u32,
}

impl TableIterator {
    pub fn new(heap: Arc<TableHeap>) -> Self {
        let page_id = heap.first_page_id();
        Self {
            heap,
            page_id,
            slot: 0,
        }
    }

    /// Restart the scan from the first page
    pub fn rewind(&mut self) {
        self.page_id = self.heap.first_page_id();
        self.slot = 0;
    }

    pub fn next(&mut self) -> Result<Option<Tuple>, TableError> {
        loop {
            if self.page_id == INVALID_PAGE_ID {
                return Ok(None);
            }

            let buffer_pool = self.heap.buffer_pool().clone();
            let page = buffer_pool.fetch_page(self.page_id)?;
            let page_manager = self.heap.page_manager();

            let (record, next_page_id) = {
                let guard = page.read();
                let count = page_manager.record_count(&guard);
                let mut found = None;
                while self.slot < count {
                    let slot = self.slot;
                    self.slot += 1;
                    if let Some(bytes) = page_manager.get_record(&guard, slot)? {
                        found = Some((bytes, Rid::new(self.page_id, slot)));
                        break;
                    }
                }
                (found, page_manager.next_page_id(&guard))
            };
            buffer_pool.unpin_page(self.page_id, false);

            match record {
                Some((bytes, rid)) => {
                    let values = bincode::deserialize(&bytes)
                        .map_err(|e| TableError::Serialization(e.to_string()))?;
                    return Ok(Some(Tuple::with_rid(values, rid)));
                }
                None => {
                    self.page_id = next_page_id;
                    self.slot = 0;
                }
            }
        }
    }
}
