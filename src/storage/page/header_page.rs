use crate::common::PageId;

use super::link::{read_link, write_link, PAGE_LINK_SIZE};

/// Header page layout:
///
/// | Field          | Offset | Size |
/// |----------------|--------|------|
/// | full list head | 0      | 8    |
/// | free list head | 8      | 8    |
pub const HEADER_PAGE_SIZE: usize = 2 * PAGE_LINK_SIZE;

/// The two page lists rooted in a relation's header page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageList {
    /// Pages with no empty slot
    Full,
    /// Pages with at least one empty slot
    Free,
}

impl PageList {
    fn head_offset(self) -> usize {
        match self {
            PageList::Full => 0,
            PageList::Free => PAGE_LINK_SIZE,
        }
    }
}

/// Mutable view over a relation's header page.
pub struct HeaderPage<'a> {
    data: &'a mut [u8],
}

impl<'a> HeaderPage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Initializes both lists as empty.
    pub fn init(&mut self) {
        self.set_head(PageList::Full, None);
        self.set_head(PageList::Free, None);
    }

    pub fn head(&self, list: PageList) -> Option<PageId> {
        read_link(&self.data[..], list.head_offset())
    }

    pub fn set_head(&mut self, list: PageList, head: Option<PageId>) {
        write_link(self.data, list.head_offset(), head);
    }
}

/// Read-only view over a relation's header page.
pub struct HeaderPageRef<'a> {
    data: &'a [u8],
}

impl<'a> HeaderPageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn head(&self, list: PageList) -> Option<PageId> {
        read_link(self.data, list.head_offset())
    }
}
