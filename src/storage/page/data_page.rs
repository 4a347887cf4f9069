use crate::common::{HeapDbError, PageId, Result, SlotId};

use super::link::{read_link, write_link, PAGE_LINK_SIZE};

/// Data page layout:
///
/// | Field      | Offset                      | Size                     |
/// |------------|-----------------------------|--------------------------|
/// | prev link  | 0                           | 8                        |
/// | next link  | 8                           | 8                        |
/// | slots      | 16                          | slot_count * record_width |
/// | bytemap    | 16 + slot_count*record_width | slot_count               |
pub const DATA_PAGE_HEADER_SIZE: usize = 2 * PAGE_LINK_SIZE;

const PREV_OFFSET: usize = 0;
const NEXT_OFFSET: usize = PAGE_LINK_SIZE;

const SLOT_FREE: u8 = 0;
const SLOT_USED: u8 = 1;

/// Slot geometry of a relation's data pages, fixed for the relation's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPageLayout {
    record_width: usize,
    slot_count: usize,
}

impl DataPageLayout {
    /// Computes how many records of `record_width` bytes fit in a page.
    pub fn new(page_size: usize, record_width: usize) -> Result<Self> {
        let slot_count = page_size.saturating_sub(DATA_PAGE_HEADER_SIZE) / (record_width + 1);
        if slot_count == 0 {
            return Err(HeapDbError::RecordTooLarge {
                width: record_width,
                page_size,
            });
        }
        Ok(Self {
            record_width,
            slot_count,
        })
    }

    pub fn record_width(&self) -> usize {
        self.record_width
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Fails with `InvalidSlotId` if the slot is outside the page.
    pub fn check_slot(&self, slot_id: SlotId) -> Result<()> {
        if slot_id.as_usize() >= self.slot_count {
            return Err(HeapDbError::InvalidSlotId(slot_id.as_u32()));
        }
        Ok(())
    }

    fn slot_range(&self, slot_id: SlotId) -> std::ops::Range<usize> {
        let start = DATA_PAGE_HEADER_SIZE + slot_id.as_usize() * self.record_width;
        start..start + self.record_width
    }

    fn bytemap_offset(&self) -> usize {
        DATA_PAGE_HEADER_SIZE + self.slot_count * self.record_width
    }
}

/// Mutable view over a data page.
pub struct DataPage<'a> {
    data: &'a mut [u8],
    layout: DataPageLayout,
}

impl<'a> DataPage<'a> {
    pub fn new(data: &'a mut [u8], layout: DataPageLayout) -> Self {
        Self { data, layout }
    }

    /// Initializes a fresh data page: unlinked, every slot free.
    pub fn init(&mut self) {
        self.set_prev(None);
        self.set_next(None);
        let start = self.layout.bytemap_offset();
        self.data[start..start + self.layout.slot_count].fill(SLOT_FREE);
    }

    pub fn view(&self) -> DataPageRef<'_> {
        DataPageRef::new(&self.data[..], self.layout)
    }

    pub fn prev(&self) -> Option<PageId> {
        self.view().prev()
    }

    pub fn next(&self) -> Option<PageId> {
        self.view().next()
    }

    pub fn set_prev(&mut self, page_id: Option<PageId>) {
        write_link(self.data, PREV_OFFSET, page_id);
    }

    pub fn set_next(&mut self, page_id: Option<PageId>) {
        write_link(self.data, NEXT_OFFSET, page_id);
    }

    pub fn is_occupied(&self, slot_id: SlotId) -> bool {
        self.view().is_occupied(slot_id)
    }

    pub fn set_occupied(&mut self, slot_id: SlotId, occupied: bool) {
        let offset = self.layout.bytemap_offset() + slot_id.as_usize();
        self.data[offset] = if occupied { SLOT_USED } else { SLOT_FREE };
    }

    pub fn first_free_slot(&self) -> Option<SlotId> {
        self.view().first_free_slot()
    }

    pub fn is_full(&self) -> bool {
        self.view().is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    pub fn slot_mut(&mut self, slot_id: SlotId) -> &mut [u8] {
        let range = self.layout.slot_range(slot_id);
        &mut self.data[range]
    }
}

/// Read-only view over a data page.
pub struct DataPageRef<'a> {
    data: &'a [u8],
    layout: DataPageLayout,
}

impl<'a> DataPageRef<'a> {
    pub fn new(data: &'a [u8], layout: DataPageLayout) -> Self {
        Self { data, layout }
    }

    pub fn prev(&self) -> Option<PageId> {
        read_link(self.data, PREV_OFFSET)
    }

    pub fn next(&self) -> Option<PageId> {
        read_link(self.data, NEXT_OFFSET)
    }

    fn bytemap(&self) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        let start = self.layout.bytemap_offset();
        &data[start..start + self.layout.slot_count]
    }

    pub fn is_occupied(&self, slot_id: SlotId) -> bool {
        self.bytemap()[slot_id.as_usize()] != SLOT_FREE
    }

    pub fn first_free_slot(&self) -> Option<SlotId> {
        self.bytemap()
            .iter()
            .position(|&b| b == SLOT_FREE)
            .map(|i| SlotId::new(i as u32))
    }

    /// Returns the first occupied slot at or after `from`.
    pub fn next_occupied_slot(&self, from: usize) -> Option<SlotId> {
        self.bytemap()
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, &b)| b != SLOT_FREE)
            .map(|(i, _)| SlotId::new(i as u32))
    }

    pub fn occupied_slots(&self) -> impl Iterator<Item = SlotId> + 'a {
        self.bytemap()
            .iter()
            .enumerate()
            .filter(|(_, &b)| b != SLOT_FREE)
            .map(|(i, _)| SlotId::new(i as u32))
    }

    pub fn occupied_count(&self) -> usize {
        self.bytemap().iter().filter(|&&b| b != SLOT_FREE).count()
    }

    pub fn is_full(&self) -> bool {
        self.bytemap().iter().all(|&b| b != SLOT_FREE)
    }

    pub fn is_empty(&self) -> bool {
        self.bytemap().iter().all(|&b| b == SLOT_FREE)
    }

    pub fn slot(&self, slot_id: SlotId) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        &data[self.layout.slot_range(slot_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_slot_count() {
        // (64 - 16) / (11 + 1) = 4
        let layout = DataPageLayout::new(64, 11).unwrap();
        assert_eq!(layout.slot_count(), 4);
        assert!(4 * (11 + 1) + DATA_PAGE_HEADER_SIZE <= 64);

        assert!(layout.check_slot(SlotId::new(3)).is_ok());
        assert!(matches!(
            layout.check_slot(SlotId::new(4)),
            Err(HeapDbError::InvalidSlotId(4))
        ));
    }

    #[test]
    fn test_layout_record_too_large() {
        assert!(matches!(
            DataPageLayout::new(64, 48),
            Err(HeapDbError::RecordTooLarge { width: 48, page_size: 64 })
        ));
        assert!(DataPageLayout::new(64, 47).is_ok());
    }

    #[test]
    fn test_data_page_slots_and_bytemap() {
        let layout = DataPageLayout::new(64, 11).unwrap();
        let mut data = [0xAAu8; 64];
        let mut page = DataPage::new(&mut data, layout);
        page.init();

        assert!(page.is_empty());
        assert_eq!(page.prev(), None);
        assert_eq!(page.next(), None);
        assert_eq!(page.first_free_slot(), Some(SlotId::new(0)));

        page.slot_mut(SlotId::new(0)).fill(7);
        page.set_occupied(SlotId::new(0), true);
        page.set_occupied(SlotId::new(2), true);

        assert_eq!(page.first_free_slot(), Some(SlotId::new(1)));
        assert!(!page.is_empty());
        assert!(!page.is_full());

        let view = page.view();
        assert_eq!(view.occupied_count(), 2);
        assert_eq!(
            view.occupied_slots().collect::<Vec<_>>(),
            vec![SlotId::new(0), SlotId::new(2)]
        );
        assert_eq!(view.next_occupied_slot(1), Some(SlotId::new(2)));
        assert_eq!(view.next_occupied_slot(3), None);
        assert_eq!(view.slot(SlotId::new(0)), &[7u8; 11]);

        // bytemap sits right after the 4 slots
        assert_eq!(data[16 + 44], 1);
        assert_eq!(data[16 + 44 + 2], 1);
    }

    #[test]
    fn test_data_page_full() {
        let layout = DataPageLayout::new(64, 11).unwrap();
        let mut data = [0u8; 64];
        let mut page = DataPage::new(&mut data, layout);
        page.init();

        for i in 0..4 {
            page.set_occupied(SlotId::new(i), true);
        }
        assert!(page.is_full());
        assert_eq!(page.first_free_slot(), None);

        page.set_occupied(SlotId::new(1), false);
        assert!(!page.is_full());
        assert!(!page.is_occupied(SlotId::new(1)));
    }

    #[test]
    fn test_data_page_links() {
        let layout = DataPageLayout::new(64, 4).unwrap();
        let mut data = [0u8; 64];
        let mut page = DataPage::new(&mut data, layout);
        page.init();
        page.set_next(Some(PageId::new(0, 9)));
        page.set_prev(Some(PageId::new(1, 2)));

        let view = DataPageRef::new(&data, layout);
        assert_eq!(view.next(), Some(PageId::new(0, 9)));
        assert_eq!(view.prev(), Some(PageId::new(1, 2)));
    }
}
