use std::fmt;
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};
use serde::{Deserialize, Serialize};

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page ID type
pub type PageId = u32;

/// Transaction ID type
pub type TxnId = u32;

/// Buffer pool frame ID type
pub type FrameId = usize;

/// Reserved page ID meaning "no page"
pub const INVALID_PAGE_ID: PageId = PageId::MAX;

/// Reserved transaction ID meaning "no transaction"
pub const INVALID_TXN_ID: TxnId = TxnId::MAX;

/// Page 0 holds the index-name to root-page-id records
pub const HEADER_PAGE_ID: PageId = 0;

/// Row identifier: the page a row lives on and its slot within that page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub page_id: PageId,
    pub slot: u32,
}

impl Rid {
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot)
    }
}

/// Page structure
pub struct Page {
    pub page_id: PageId,
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            data: [0; PAGE_SIZE],
        }
    }

    /// Zero the data buffer and retag the page
    pub fn reset(&mut self, page_id: PageId) {
        self.page_id = page_id;
        self.data.fill(0);
    }
}

/// Smart pointer to a page; the RwLock is the page latch
pub type PagePtr = Arc<RwLock<Page>>;

/// Owned read latch on a page (survives the borrow of the pool)
pub type PageReadGuard = ArcRwLockReadGuard<RawRwLock, Page>;

/// Owned write latch on a page
pub type PageWriteGuard = ArcRwLockWriteGuard<RawRwLock, Page>;
