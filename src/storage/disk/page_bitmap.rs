use crate::common::{BITMAP_SIZE, MAX_PAGES_PER_FILE};

/// In-memory copy of the occupancy bitmap stored at the head of a data file.
///
/// Page `i` is tracked by bit `i % 8` (least significant first) of byte `i / 8`.
/// A set bit means the page is in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBitmap {
    bits: [u8; BITMAP_SIZE],
    used_count: u32,
}

impl PageBitmap {
    /// Creates an all-free bitmap.
    pub fn new() -> Self {
        Self {
            bits: [0u8; BITMAP_SIZE],
            used_count: 0,
        }
    }

    /// Rebuilds a bitmap from the bytes read out of a file header.
    pub fn from_bytes(bytes: &[u8; BITMAP_SIZE]) -> Self {
        let used_count = bytes.iter().map(|b| b.count_ones()).sum();
        Self {
            bits: *bytes,
            used_count,
        }
    }

    pub fn as_bytes(&self) -> &[u8; BITMAP_SIZE] {
        &self.bits
    }

    pub fn is_set(&self, page_idx: u32) -> bool {
        if page_idx >= MAX_PAGES_PER_FILE {
            return false;
        }
        let (byte, mask) = Self::locate(page_idx);
        self.bits[byte] & mask != 0
    }

    /// Marks a page used. Returns false if it already was.
    pub fn set(&mut self, page_idx: u32) -> bool {
        if page_idx >= MAX_PAGES_PER_FILE {
            return false;
        }
        let (byte, mask) = Self::locate(page_idx);
        if self.bits[byte] & mask != 0 {
            return false;
        }
        self.bits[byte] |= mask;
        self.used_count += 1;
        true
    }

    /// Marks a page free. Returns false if it already was.
    pub fn clear(&mut self, page_idx: u32) -> bool {
        if page_idx >= MAX_PAGES_PER_FILE {
            return false;
        }
        let (byte, mask) = Self::locate(page_idx);
        if self.bits[byte] & mask == 0 {
            return false;
        }
        self.bits[byte] &= !mask;
        self.used_count -= 1;
        true
    }

    /// Returns the first free page index below `limit`.
    pub fn first_free_below(&self, limit: u32) -> Option<u32> {
        (0..limit.min(MAX_PAGES_PER_FILE)).find(|&i| !self.is_set(i))
    }

    pub fn used_count(&self) -> u32 {
        self.used_count
    }

    fn locate(page_idx: u32) -> (usize, u8) {
        ((page_idx / 8) as usize, 1u8 << (page_idx % 8))
    }
}

impl Default for PageBitmap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_order_is_lsb_first() {
        let mut bitmap = PageBitmap::new();
        bitmap.set(0);
        bitmap.set(9);

        assert_eq!(bitmap.as_bytes()[0], 0b0000_0001);
        assert_eq!(bitmap.as_bytes()[1], 0b0000_0010);
        assert_eq!(bitmap.used_count(), 2);
    }

    #[test]
    fn test_set_and_clear_are_idempotent() {
        let mut bitmap = PageBitmap::new();

        assert!(bitmap.set(3));
        assert!(!bitmap.set(3));
        assert!(bitmap.is_set(3));

        assert!(bitmap.clear(3));
        assert!(!bitmap.clear(3));
        assert!(!bitmap.is_set(3));
        assert_eq!(bitmap.used_count(), 0);
    }

    #[test]
    fn test_first_free_below() {
        let mut bitmap = PageBitmap::new();
        for i in 0..4 {
            bitmap.set(i);
        }

        assert_eq!(bitmap.first_free_below(4), None);
        assert_eq!(bitmap.first_free_below(6), Some(4));

        bitmap.clear(1);
        assert_eq!(bitmap.first_free_below(4), Some(1));
    }

    #[test]
    fn test_from_bytes_counts_used_pages() {
        let mut bytes = [0u8; BITMAP_SIZE];
        bytes[0] = 0b1010_0000;
        bytes[63] = 0b1000_0000;

        let bitmap = PageBitmap::from_bytes(&bytes);
        assert_eq!(bitmap.used_count(), 3);
        assert!(bitmap.is_set(5));
        assert!(bitmap.is_set(7));
        assert!(bitmap.is_set(511));
        assert!(!bitmap.is_set(512));
    }
}
