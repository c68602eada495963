use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{PageId, INVALID_PAGE_ID, PAGE_SIZE};
use crate::storage::page::layout::HEADER_SIZE;

/// In-memory view of the fixed header at the start of a slotted page
#[derive(Debug, Clone, Copy)]
pub struct PageHeader {
    pub record_count: u32,
    pub free_space_offset: u32,
    pub free_space_size: u32,
    pub next_page_id: PageId,
}

impl PageHeader {
    pub fn new() -> Self {
        Self {
            record_count: 0,
            free_space_offset: HEADER_SIZE as u32,
            free_space_size: (PAGE_SIZE - HEADER_SIZE) as u32,
            next_page_id: INVALID_PAGE_ID,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], self.record_count);
        LittleEndian::write_u32(&mut bytes[4..8], self.free_space_offset);
        LittleEndian::write_u32(&mut bytes[8..12], self.free_space_size);
        LittleEndian::write_u32(&mut bytes[12..16], self.next_page_id);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            record_count: LittleEndian::read_u32(&bytes[0..4]),
            free_space_offset: LittleEndian::read_u32(&bytes[4..8]),
            free_space_size: LittleEndian::read_u32(&bytes[8..12]),
            next_page_id: LittleEndian::read_u32(&bytes[12..16]),
        }
    }
}

impl Default for PageHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = PageHeader {
            record_count: 3,
            free_space_offset: 128,
            free_space_size: 2048,
            next_page_id: 17,
        };
        let bytes = header.to_bytes();
        let parsed = PageHeader::from_bytes(&bytes);
        assert_eq!(parsed.record_count, 3);
        assert_eq!(parsed.free_space_offset, 128);
        assert_eq!(parsed.free_space_size, 2048);
        assert_eq!(parsed.next_page_id, 17);
    }
}
