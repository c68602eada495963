use anyhow::Result;

mod common;
use common::create_test_buffer_pool;

use loondb::common::types::{Page, INVALID_PAGE_ID};
use loondb::storage::buffer::BufferPoolError;

#[test]
fn test_new_page_and_fetch() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(10)?;

    let (page, page_id) = buffer_pool.new_page()?;
    {
        let guard = page.read();
        assert_eq!(guard.page_id, page_id);
    }
    assert!(buffer_pool.unpin_page(page_id, false));

    let fetched = buffer_pool.fetch_page(page_id)?;
    assert_eq!(fetched.read().page_id, page_id);
    assert!(buffer_pool.unpin_page(page_id, false));

    Ok(())
}

#[test]
fn test_modification_survives_eviction() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(3)?;

    let (page, page_id) = buffer_pool.new_page()?;
    {
        let mut guard = page.write();
        guard.data[100..109].copy_from_slice(b"Test Data");
    }
    assert!(buffer_pool.unpin_page(page_id, true));

    // Churn through enough pages to evict the first one
    for _ in 0..6 {
        let (_, id) = buffer_pool.new_page()?;
        buffer_pool.unpin_page(id, true);
    }

    let fetched = buffer_pool.fetch_page(page_id)?;
    assert_eq!(&fetched.read().data[100..109], b"Test Data");
    buffer_pool.unpin_page(page_id, false);

    Ok(())
}

#[test]
fn test_eviction_prefers_unpinned_frame() -> Result<()> {
    // Pool of 3: fill it, then a fourth page must fail until one unpin
    let (buffer_pool, _file) = create_test_buffer_pool(3)?;

    let (_p0, id0) = buffer_pool.new_page()?;
    let (_p1, id1) = buffer_pool.new_page()?;
    let (_p2, id2) = buffer_pool.new_page()?;
    assert_eq!((id0, id1, id2), (0, 1, 2));

    assert!(matches!(
        buffer_pool.new_page(),
        Err(BufferPoolError::BufferPoolFull)
    ));

    assert!(buffer_pool.unpin_page(id0, false));
    let (_, new_id) = buffer_pool.new_page()?;
    assert_eq!(new_id, 3);

    // id0 was evicted to make room; fetching it reads from disk again
    assert!(matches!(
        buffer_pool.new_page(),
        Err(BufferPoolError::BufferPoolFull)
    ));

    Ok(())
}

#[test]
fn test_unpin_of_unpinned_page_fails() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(4)?;

    let (_, page_id) = buffer_pool.new_page()?;
    assert!(buffer_pool.unpin_page(page_id, false));
    assert!(!buffer_pool.unpin_page(page_id, false));
    assert!(!buffer_pool.unpin_page(999, false));

    Ok(())
}

#[test]
fn test_pin_count_blocks_delete() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(4)?;

    let (_page, page_id) = buffer_pool.new_page()?;
    assert!(!buffer_pool.delete_page(page_id)?);

    buffer_pool.unpin_page(page_id, false);
    assert!(buffer_pool.delete_page(page_id)?);

    // Absent page deletes trivially
    assert!(buffer_pool.delete_page(page_id)?);

    Ok(())
}

#[test]
fn test_flush_all_reaches_disk() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(8)?;

    let mut ids = Vec::new();
    for i in 0..5u8 {
        let (page, page_id) = buffer_pool.new_page()?;
        page.write().data[0] = i + 1;
        buffer_pool.unpin_page(page_id, true);
        ids.push(page_id);
    }

    buffer_pool.flush_all_pages()?;

    // Read the raw file through the disk manager and compare
    let disk = buffer_pool.disk_manager();
    for (i, &page_id) in ids.iter().enumerate() {
        let mut page = Page::new(INVALID_PAGE_ID);
        disk.read_page(page_id, &mut page)?;
        assert_eq!(page.data[0], i as u8 + 1);
    }

    Ok(())
}

#[test]
fn test_flush_page_clears_dirty() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(4)?;

    let (page, page_id) = buffer_pool.new_page()?;
    page.write().data[7] = 42;
    buffer_pool.unpin_page(page_id, true);

    assert!(buffer_pool.flush_page(page_id)?);
    assert!(!buffer_pool.flush_page(INVALID_PAGE_ID - 1)?);

    let disk = buffer_pool.disk_manager();
    let mut raw = Page::new(INVALID_PAGE_ID);
    disk.read_page(page_id, &mut raw)?;
    assert_eq!(raw.data[7], 42);

    Ok(())
}
