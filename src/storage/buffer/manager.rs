use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::common::types::{
    FrameId, Page, PageId, PagePtr, HEADER_PAGE_ID, INVALID_PAGE_ID,
};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::replacer::LruReplacer;
use crate::storage::disk::DiskManager;
use crate::storage::page::HeaderPage;

/// Bookkeeping for one frame, kept under the pool latch so the page RwLock
/// stays a pure page latch.
struct FrameMeta {
    page_id: PageId,
    pin_count: u32,
    is_dirty: bool,
}

impl FrameMeta {
    fn empty() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            pin_count: 0,
            is_dirty: false,
        }
    }
}

/// All mutable pool state behind the single pool latch
struct PoolInner {
    frames: Vec<FrameMeta>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: LruReplacer,
    next_page_id: PageId,
}

/// Buffer pool manager: maps page ids onto a fixed array of in-memory
/// frames, fetching through the disk manager and evicting with LRU.
///
/// When striped across `num_instances` pools, each instance hands out page
/// ids congruent to its `instance_index`.
pub struct BufferPoolManager {
    pool_size: usize,
    pages: Vec<PagePtr>,
    inner: Mutex<PoolInner>,
    disk_manager: Arc<DiskManager>,
    num_instances: u32,
    instance_index: u32,
}

impl BufferPoolManager {
    /// Create a standalone pool over its own database file
    pub fn new(pool_size: usize, db_path: impl AsRef<Path>) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        Ok(Self::new_instance(pool_size, disk_manager, 1, 0))
    }

    /// Create one instance of a striped pool over a shared disk manager
    pub fn new_instance(
        pool_size: usize,
        disk_manager: Arc<DiskManager>,
        num_instances: u32,
        instance_index: u32,
    ) -> Self {
        let mut pages = Vec::with_capacity(pool_size);
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for frame_id in 0..pool_size {
            pages.push(Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID))));
            frames.push(FrameMeta::empty());
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            pages,
            inner: Mutex::new(PoolInner {
                frames,
                page_table: HashMap::new(),
                free_list,
                replacer: LruReplacer::new(pool_size),
                next_page_id: instance_index as PageId,
            }),
            disk_manager,
            num_instances,
            instance_index,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn disk_manager(&self) -> Arc<DiskManager> {
        self.disk_manager.clone()
    }

    /// Initialize the well-known header page (page 0) if this pool has not
    /// allocated anything yet. Called once during engine bootstrap, before
    /// any index or table pages exist.
    pub fn ensure_header_page(&self) -> Result<(), BufferPoolError> {
        if self.instance_index != 0 {
            return Ok(());
        }
        {
            let inner = self.inner.lock();
            if inner.next_page_id != HEADER_PAGE_ID {
                return Ok(());
            }
        }
        let (page, page_id) = self.new_page()?;
        debug_assert_eq!(page_id, HEADER_PAGE_ID);
        HeaderPage::new().init(&mut page.write());
        self.unpin_page(page_id, true);
        Ok(())
    }

    /// Fetch a page, reading it from disk if it is not resident. The page
    /// comes back pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut inner = self.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            inner.frames[frame_id].pin_count += 1;
            inner.replacer.pin(frame_id);
            return Ok(self.pages[frame_id].clone());
        }

        let frame_id = self.acquire_frame(&mut inner)?;

        // The frame's pin count is zero, so nothing holds the page latch
        {
            let mut page = self.pages[frame_id].write();
            page.reset(page_id);
            if let Err(e) = self.disk_manager.read_page(page_id, &mut page) {
                drop(page);
                inner.free_list.push_back(frame_id);
                return Err(e.into());
            }
        }

        inner.page_table.insert(page_id, frame_id);
        inner.frames[frame_id] = FrameMeta {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };

        Ok(self.pages[frame_id].clone())
    }

    /// Allocate a fresh page id and bind it to a zeroed frame, pinned
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let mut inner = self.inner.lock();

        let frame_id = self.acquire_frame(&mut inner)?;

        let page_id = inner.next_page_id;
        inner.next_page_id += self.num_instances;

        self.pages[frame_id].write().reset(page_id);

        inner.page_table.insert(page_id, frame_id);
        inner.frames[frame_id] = FrameMeta {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };

        Ok((self.pages[frame_id].clone(), page_id))
    }

    /// Drop one pin; returns false for an unknown or already-unpinned page
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut inner = self.inner.lock();

        let frame_id = match inner.page_table.get(&page_id) {
            Some(&id) => id,
            None => return false,
        };

        let meta = &mut inner.frames[frame_id];
        if meta.pin_count == 0 {
            return false;
        }
        meta.pin_count -= 1;
        meta.is_dirty |= is_dirty;

        if meta.pin_count == 0 {
            inner.replacer.unpin(frame_id);
        }
        true
    }

    /// Write a resident page to disk and clear its dirty flag. Returns false
    /// if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        // Clone the page handle under the pool latch, then latch the page
        // outside it (a latch holder may itself be waiting on the pool).
        let (page_ptr, frame_id) = {
            let inner = self.inner.lock();
            match inner.page_table.get(&page_id) {
                Some(&frame_id) => (self.pages[frame_id].clone(), frame_id),
                None => return Ok(false),
            }
        };

        {
            let page = page_ptr.read();
            if page.page_id == page_id {
                self.disk_manager.write_page(&page)?;
            }
        }

        let mut inner = self.inner.lock();
        if inner.page_table.get(&page_id) == Some(&frame_id) {
            inner.frames[frame_id].is_dirty = false;
        }
        Ok(true)
    }

    /// Flush every resident page
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let page_ids: Vec<PageId> = {
            let inner = self.inner.lock();
            inner.page_table.keys().copied().collect()
        };
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Evict a page and return its frame to the free list. Fails (returns
    /// false) while the page is pinned; an absent page trivially succeeds.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let mut inner = self.inner.lock();

        let frame_id = match inner.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Ok(true),
        };

        if inner.frames[frame_id].pin_count > 0 {
            return Ok(false);
        }

        if inner.frames[frame_id].is_dirty {
            let page = self.pages[frame_id].read();
            self.disk_manager.write_page(&page)?;
        }

        inner.page_table.remove(&page_id);
        inner.replacer.pin(frame_id);
        inner.frames[frame_id] = FrameMeta::empty();
        self.pages[frame_id].write().reset(INVALID_PAGE_ID);
        inner.free_list.push_back(frame_id);

        Ok(true)
    }

    /// Take a frame from the free list, or evict the LRU victim. The caller
    /// still holds the pool latch.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = match inner.replacer.victim() {
            Some(id) => id,
            None => return Err(BufferPoolError::BufferPoolFull),
        };

        let old_page_id = inner.frames[frame_id].page_id;
        if inner.frames[frame_id].is_dirty {
            // Victim has pin count zero, so its latch is free
            let page = self.pages[frame_id].read();
            if let Err(e) = self.disk_manager.write_page(&page) {
                drop(page);
                inner.replacer.unpin(frame_id);
                return Err(e.into());
            }
        }
        debug!("evicting page {} from frame {}", old_page_id, frame_id);
        inner.page_table.remove(&old_page_id);
        inner.frames[frame_id] = FrameMeta::empty();

        Ok(frame_id)
    }
}
