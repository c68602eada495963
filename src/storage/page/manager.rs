use crate::common::types::{Page, PageId, PAGE_SIZE};
use crate::storage::page::error::PageError;
use crate::storage::page::header::PageHeader;
use crate::storage::page::layout::{RecordLocation, HEADER_SIZE, RECORD_OFFSET_SIZE};

/// Stateless accessor for the slotted-page layout.
///
/// Record data grows upward from just past the header; the slot array grows
/// downward from the end of the page. Deleting a record tombstones its slot
/// (length 0) so later slots keep their numbers.
pub struct PageManager;

impl PageManager {
    pub fn new() -> Self {
        Self
    }

    pub fn init_page(&self, page: &mut Page) {
        let header = PageHeader::new();
        page.data[0..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn get_header(&self, page: &Page) -> PageHeader {
        PageHeader::from_bytes(&page.data[0..HEADER_SIZE])
    }

    pub fn set_header(&self, page: &mut Page, header: &PageHeader) {
        page.data[0..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn record_count(&self, page: &Page) -> u32 {
        self.get_header(page).record_count
    }

    pub fn next_page_id(&self, page: &Page) -> PageId {
        self.get_header(page).next_page_id
    }

    pub fn set_next_page_id(&self, page: &mut Page, next: PageId) {
        let mut header = self.get_header(page);
        header.next_page_id = next;
        self.set_header(page, &header);
    }

    /// Append a record, returning its slot number
    pub fn insert_record(&self, page: &mut Page, data: &[u8]) -> Result<u32, PageError> {
        let mut header = self.get_header(page);

        let record_size = data.len() as u32;
        let total_space_needed = record_size + RECORD_OFFSET_SIZE as u32;
        if header.free_space_size < total_space_needed {
            return Err(PageError::InsufficientSpace);
        }

        let slot = header.record_count;
        let slot_pos = Self::slot_position(slot);

        let record_loc = RecordLocation {
            offset: header.free_space_offset,
            length: record_size,
        };

        let data_start = header.free_space_offset as usize;
        page.data[data_start..data_start + data.len()].copy_from_slice(data);
        page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE].copy_from_slice(&record_loc.to_bytes());

        header.free_space_offset += record_size;
        header.free_space_size -= total_space_needed;
        header.record_count += 1;
        self.set_header(page, &header);

        Ok(slot)
    }

    /// Fetch a record's bytes; `None` for a tombstoned slot
    pub fn get_record(&self, page: &Page, slot: u32) -> Result<Option<Vec<u8>>, PageError> {
        let header = self.get_header(page);
        if slot >= header.record_count {
            return Err(PageError::InvalidSlot(slot));
        }

        let loc = self.get_record_location(page, slot);
        if loc.is_deleted() {
            return Ok(None);
        }

        let start = loc.offset as usize;
        let end = start + loc.length as usize;
        Ok(Some(page.data[start..end].to_vec()))
    }

    /// Tombstone a record's slot
    pub fn delete_record(&self, page: &mut Page, slot: u32) -> Result<(), PageError> {
        let mut header = self.get_header(page);
        if slot >= header.record_count {
            return Err(PageError::InvalidSlot(slot));
        }

        let slot_pos = Self::slot_position(slot);
        let mut loc = self.get_record_location(page, slot);
        if loc.is_deleted() {
            return Err(PageError::RecordNotFound);
        }

        // Mark deleted; the data bytes stay where they are until compaction
        loc.length = 0;
        page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE].copy_from_slice(&loc.to_bytes());

        header.free_space_size += RECORD_OFFSET_SIZE as u32;
        self.set_header(page, &header);

        Ok(())
    }

    /// Rewrite a record in place, keeping its slot number. Larger payloads
    /// relocate to the free region.
    pub fn update_record(&self, page: &mut Page, slot: u32, data: &[u8]) -> Result<(), PageError> {
        let mut header = self.get_header(page);
        if slot >= header.record_count {
            return Err(PageError::InvalidSlot(slot));
        }

        let slot_pos = Self::slot_position(slot);
        let loc = self.get_record_location(page, slot);
        if loc.is_deleted() {
            return Err(PageError::RecordNotFound);
        }

        let new_size = data.len() as u32;
        if new_size <= loc.length {
            let start = loc.offset as usize;
            page.data[start..start + data.len()].copy_from_slice(data);
            let new_loc = RecordLocation {
                offset: loc.offset,
                length: new_size,
            };
            page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE].copy_from_slice(&new_loc.to_bytes());
            return Ok(());
        }

        // Relocate: the old bytes become dead space
        let growth = new_size - loc.length;
        if header.free_space_size < growth {
            return Err(PageError::InsufficientSpace);
        }

        let new_offset = header.free_space_offset;
        let start = new_offset as usize;
        page.data[start..start + data.len()].copy_from_slice(data);

        let new_loc = RecordLocation {
            offset: new_offset,
            length: new_size,
        };
        page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE].copy_from_slice(&new_loc.to_bytes());

        header.free_space_offset += new_size;
        header.free_space_size -= growth;
        self.set_header(page, &header);

        Ok(())
    }

    fn get_record_location(&self, page: &Page, slot: u32) -> RecordLocation {
        let slot_pos = Self::slot_position(slot);
        RecordLocation::from_bytes(&page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE])
    }

    fn slot_position(slot: u32) -> usize {
        PAGE_SIZE - RECORD_OFFSET_SIZE * (slot as usize + 1)
    }
}

impl Default for PageManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::INVALID_PAGE_ID;

    fn fresh_page() -> (PageManager, Page) {
        let pm = PageManager::new();
        let mut page = Page::new(1);
        pm.init_page(&mut page);
        (pm, page)
    }

    #[test]
    fn test_insert_and_get() {
        let (pm, mut page) = fresh_page();

        let slot0 = pm.insert_record(&mut page, b"first").unwrap();
        let slot1 = pm.insert_record(&mut page, b"second").unwrap();
        assert_eq!(slot0, 0);
        assert_eq!(slot1, 1);

        assert_eq!(pm.get_record(&page, 0).unwrap().unwrap(), b"first");
        assert_eq!(pm.get_record(&page, 1).unwrap().unwrap(), b"second");
        assert!(pm.get_record(&page, 2).is_err());
    }

    #[test]
    fn test_delete_keeps_slot_numbers() {
        let (pm, mut page) = fresh_page();
        pm.insert_record(&mut page, b"a").unwrap();
        pm.insert_record(&mut page, b"b").unwrap();
        pm.insert_record(&mut page, b"c").unwrap();

        pm.delete_record(&mut page, 1).unwrap();
        assert!(pm.get_record(&page, 1).unwrap().is_none());
        assert_eq!(pm.get_record(&page, 2).unwrap().unwrap(), b"c");

        // Double delete is an error
        assert!(pm.delete_record(&mut page, 1).is_err());
    }

    #[test]
    fn test_update_in_place_and_relocated() {
        let (pm, mut page) = fresh_page();
        pm.insert_record(&mut page, b"hello world").unwrap();

        pm.update_record(&mut page, 0, b"hi").unwrap();
        assert_eq!(pm.get_record(&page, 0).unwrap().unwrap(), b"hi");

        pm.update_record(&mut page, 0, b"a considerably longer payload")
            .unwrap();
        assert_eq!(
            pm.get_record(&page, 0).unwrap().unwrap(),
            b"a considerably longer payload"
        );
    }

    #[test]
    fn test_page_fills_up() {
        let (pm, mut page) = fresh_page();
        let blob = vec![7u8; 512];
        let mut inserted = 0;
        loop {
            match pm.insert_record(&mut page, &blob) {
                Ok(_) => inserted += 1,
                Err(PageError::InsufficientSpace) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        // 4080 usable bytes, 520 per record
        assert_eq!(inserted, 7);
    }

    #[test]
    fn test_next_page_id_link() {
        let (pm, mut page) = fresh_page();
        assert_eq!(pm.next_page_id(&page), INVALID_PAGE_ID);
        pm.set_next_page_id(&mut page, 9);
        assert_eq!(pm.next_page_id(&page), 9);
    }
}
