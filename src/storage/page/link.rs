use bytes::{Buf, BufMut};

use crate::common::PageId;

/// Size of one on-disk page link: two big-endian 4-byte integers.
pub const PAGE_LINK_SIZE: usize = 8;

/// Raw integer stored in both halves of a null link.
const NULL_LINK: i32 = -1;

/// Reads the page link stored at `offset`, mapping the null pair to `None`.
pub fn read_link(data: &[u8], offset: usize) -> Option<PageId> {
    let mut buf = &data[offset..offset + PAGE_LINK_SIZE];
    let file_idx = buf.get_i32();
    let page_idx = buf.get_i32();
    if file_idx < 0 || page_idx < 0 {
        None
    } else {
        Some(PageId::new(file_idx as u32, page_idx as u32))
    }
}

/// Writes a page link at `offset`; `None` is stored as the null pair.
pub fn write_link(data: &mut [u8], offset: usize, link: Option<PageId>) {
    let (file_idx, page_idx) = link.map_or((NULL_LINK, NULL_LINK), |id| {
        (id.file_idx as i32, id.page_idx as i32)
    });
    let mut buf = &mut data[offset..offset + PAGE_LINK_SIZE];
    buf.put_i32(file_idx);
    buf.put_i32(page_idx);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_link_is_minus_one_pair() {
        let mut data = [0u8; 16];
        write_link(&mut data, 4, None);

        assert_eq!(&data[4..12], &[0xFF; 8]);
        assert_eq!(read_link(&data, 4), None);
    }

    #[test]
    fn test_link_is_big_endian() {
        let mut data = [0u8; 8];
        write_link(&mut data, 0, Some(PageId::new(1, 258)));

        assert_eq!(data, [0, 0, 0, 1, 0, 0, 1, 2]);
        assert_eq!(read_link(&data, 0), Some(PageId::new(1, 258)));
    }

    #[test]
    fn test_zeroed_bytes_read_as_first_page() {
        let data = [0u8; 8];
        assert_eq!(read_link(&data, 0), Some(PageId::new(0, 0)));
    }
}
