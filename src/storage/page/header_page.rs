use serde::{Deserialize, Serialize};

use crate::common::types::{Page, PageId};
use crate::storage::page::error::PageError;
use crate::storage::page::manager::PageManager;

/// One name → root-page-id record on the header page
#[derive(Serialize, Deserialize)]
struct RootRecord {
    name: String,
    root_page_id: PageId,
}

/// Accessor for the well-known header page (page 0), which maps
/// human-readable index names to their root page ids.
///
/// Records live in the ordinary slotted layout; lookups scan the slot array,
/// which is fine at header-page cardinalities.
pub struct HeaderPage {
    page_manager: PageManager,
}

impl HeaderPage {
    pub fn new() -> Self {
        Self {
            page_manager: PageManager::new(),
        }
    }

    pub fn init(&self, page: &mut Page) {
        self.page_manager.init_page(page);
    }

    /// Register a name. Returns false if the name is already present.
    pub fn insert_record(
        &self,
        page: &mut Page,
        name: &str,
        root_page_id: PageId,
    ) -> Result<bool, PageError> {
        if self.find_slot(page, name)?.is_some() {
            return Ok(false);
        }

        let record = RootRecord {
            name: name.to_string(),
            root_page_id,
        };
        let bytes =
            bincode::serialize(&record).map_err(|e| PageError::Serialization(e.to_string()))?;
        self.page_manager.insert_record(page, &bytes)?;
        Ok(true)
    }

    /// Repoint a name at a new root. Returns false if the name is unknown.
    pub fn update_record(
        &self,
        page: &mut Page,
        name: &str,
        root_page_id: PageId,
    ) -> Result<bool, PageError> {
        let slot = match self.find_slot(page, name)? {
            Some(slot) => slot,
            None => return Ok(false),
        };

        let record = RootRecord {
            name: name.to_string(),
            root_page_id,
        };
        let bytes =
            bincode::serialize(&record).map_err(|e| PageError::Serialization(e.to_string()))?;
        self.page_manager.update_record(page, slot, &bytes)?;
        Ok(true)
    }

    /// Look up a name's root page id
    pub fn get_record(&self, page: &Page, name: &str) -> Result<Option<PageId>, PageError> {
        for slot in 0..self.page_manager.record_count(page) {
            if let Some(bytes) = self.page_manager.get_record(page, slot)? {
                let record: RootRecord = bincode::deserialize(&bytes)
                    .map_err(|e| PageError::Serialization(e.to_string()))?;
                if record.name == name {
                    return Ok(Some(record.root_page_id));
                }
            }
        }
        Ok(None)
    }

    /// Drop a name. Returns false if the name is unknown.
    pub fn delete_record(&self, page: &mut Page, name: &str) -> Result<bool, PageError> {
        match self.find_slot(page, name)? {
            Some(slot) => {
                self.page_manager.delete_record(page, slot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_slot(&self, page: &Page, name: &str) -> Result<Option<u32>, PageError> {
        for slot in 0..self.page_manager.record_count(page) {
            if let Some(bytes) = self.page_manager.get_record(page, slot)? {
                let record: RootRecord = bincode::deserialize(&bytes)
                    .map_err(|e| PageError::Serialization(e.to_string()))?;
                if record.name == name {
                    return Ok(Some(slot));
                }
            }
        }
        Ok(None)
    }
}

impl Default for HeaderPage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::HEADER_PAGE_ID;

    #[test]
    fn test_insert_update_get_delete() {
        let header = HeaderPage::new();
        let mut page = Page::new(HEADER_PAGE_ID);
        header.init(&mut page);

        assert!(header.insert_record(&mut page, "orders_pk", 5).unwrap());
        assert!(!header.insert_record(&mut page, "orders_pk", 6).unwrap());
        assert_eq!(header.get_record(&page, "orders_pk").unwrap(), Some(5));

        assert!(header.update_record(&mut page, "orders_pk", 11).unwrap());
        assert_eq!(header.get_record(&page, "orders_pk").unwrap(), Some(11));

        assert!(!header.update_record(&mut page, "missing", 1).unwrap());
        assert_eq!(header.get_record(&page, "missing").unwrap(), None);

        assert!(header.delete_record(&mut page, "orders_pk").unwrap());
        assert_eq!(header.get_record(&page, "orders_pk").unwrap(), None);
        assert!(!header.delete_record(&mut page, "orders_pk").unwrap());
    }
}
