use std::sync::Arc;

use log::{debug, info, warn};

use crate::buffer::BufferPoolManager;
use crate::common::{HeapDbError, PageId, RecordId, Result, SlotId};
use crate::storage::disk::DiskManager;
use crate::storage::page::{
    DataPage, DataPageLayout, DataPageRef, HeaderPage, HeaderPageRef, PageList,
};
use crate::tuple::{Record, RecordCodec, Schema};

/// A named table stored as a heap of fixed-slot data pages.
///
/// The data pages form two disjoint doubly-linked lists rooted in the header
/// page: the free list holds pages with at least one empty slot, the full list
/// holds the rest. Pages are always linked at the head of a list. A page whose
/// last record is deleted is unlinked and deallocated.
pub struct HeapRelation {
    /// Relation name
    name: String,
    /// Column list shared with scans and the catalog
    schema: Arc<Schema>,
    /// Page holding the two list heads
    header_page_id: PageId,
    /// Slot geometry of the data pages
    layout: DataPageLayout,
    disk_manager: Arc<DiskManager>,
    bpm: Arc<BufferPoolManager>,
}

impl HeapRelation {
    /// Creates an empty relation, allocating and initializing its header page.
    pub fn create(
        name: impl Into<String>,
        schema: Arc<Schema>,
        disk_manager: Arc<DiskManager>,
        bpm: Arc<BufferPoolManager>,
    ) -> Result<Self> {
        let name = name.into();
        let layout = DataPageLayout::new(bpm.page_size(), schema.record_width())?;

        let header_page_id = bpm.new_page()?;
        {
            let mut guard = bpm.write_page(header_page_id)?;
            HeaderPage::new(guard.data_mut()).init();
        }

        info!(
            "created relation {} at {} ({} slots of {} bytes per page)",
            name,
            header_page_id,
            layout.slot_count(),
            layout.record_width()
        );

        Ok(Self {
            name,
            schema,
            header_page_id,
            layout,
            disk_manager,
            bpm,
        })
    }

    /// Reconstructs a relation from its catalog entry without touching its pages.
    pub fn open(
        name: impl Into<String>,
        schema: Arc<Schema>,
        header_page_id: PageId,
        disk_manager: Arc<DiskManager>,
        bpm: Arc<BufferPoolManager>,
    ) -> Result<Self> {
        let name = name.into();
        let layout = DataPageLayout::new(bpm.page_size(), schema.record_width())?;

        if !disk_manager.is_allocated(header_page_id) {
            warn!(
                "relation {} refers to unallocated header {}",
                name, header_page_id
            );
        }

        Ok(Self {
            name,
            schema,
            header_page_id,
            layout,
            disk_manager,
            bpm,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    pub fn layout(&self) -> DataPageLayout {
        self.layout
    }

    /// Number of record slots in each data page.
    pub fn slot_count(&self) -> usize {
        self.layout.slot_count()
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    /// Stores a record in the first free slot of the free list, adding a data
    /// page when the free list has none.
    pub fn insert(&self, record: &Record) -> Result<RecordId> {
        let bytes = RecordCodec::encode_to_vec(&self.schema, record)?;

        let (page_id, slot_id) = match self.find_free_slot()? {
            Some(found) => found,
            None => {
                let added = self.add_data_page()?;
                self.find_free_slot()?
                    .ok_or(HeapDbError::PageFull(added))?
            }
        };

        let now_full = {
            let mut guard = self.bpm.write_page(page_id)?;
            let mut page = DataPage::new(guard.data_mut(), self.layout);
            page.slot_mut(slot_id).copy_from_slice(&bytes);
            page.set_occupied(slot_id, true);
            page.is_full()
        };

        if now_full {
            self.unlink(PageList::Free, page_id)?;
            self.push_front(PageList::Full, page_id)?;
            debug!("{}: {} moved to the full list", self.name, page_id);
        }

        Ok(RecordId::new(page_id, slot_id))
    }

    /// Removes the record at `rid`.
    pub fn delete(&self, rid: RecordId) -> Result<()> {
        self.layout.check_slot(rid.slot_id)?;

        let (was_full, now_empty) = {
            let mut guard = self.bpm.write_page(rid.page_id)?;
            let view = DataPageRef::new(guard.data(), self.layout);
            if !view.is_occupied(rid.slot_id) {
                return Err(HeapDbError::EmptySlot(rid.slot_id.as_u32()));
            }
            let was_full = view.is_full();

            let mut page = DataPage::new(guard.data_mut(), self.layout);
            page.set_occupied(rid.slot_id, false);
            (was_full, page.is_empty())
        };

        if now_empty {
            let list = if was_full {
                PageList::Full
            } else {
                PageList::Free
            };
            self.unlink(list, rid.page_id)?;
            self.bpm.delete_page(rid.page_id)?;
            debug!("{}: {} emptied and deallocated", self.name, rid.page_id);
        } else if was_full {
            self.unlink(PageList::Full, rid.page_id)?;
            self.push_front(PageList::Free, rid.page_id)?;
            debug!("{}: {} moved to the free list", self.name, rid.page_id);
        }

        Ok(())
    }

    /// Reads one record.
    pub fn read_record(&self, rid: RecordId) -> Result<Record> {
        self.layout.check_slot(rid.slot_id)?;

        let guard = self.bpm.read_page(rid.page_id)?;
        let view = DataPageRef::new(guard.data(), self.layout);
        if !view.is_occupied(rid.slot_id) {
            return Err(HeapDbError::EmptySlot(rid.slot_id.as_u32()));
        }
        RecordCodec::decode(&self.schema, view.slot(rid.slot_id))
    }

    /// Rewrites the record at `rid` in place.
    pub fn update(&self, rid: RecordId, record: &Record) -> Result<()> {
        let bytes = RecordCodec::encode_to_vec(&self.schema, record)?;
        self.layout.check_slot(rid.slot_id)?;

        let mut guard = self.bpm.write_page(rid.page_id)?;
        if !DataPageRef::new(guard.data(), self.layout).is_occupied(rid.slot_id) {
            return Err(HeapDbError::EmptySlot(rid.slot_id.as_u32()));
        }
        DataPage::new(guard.data_mut(), self.layout)
            .slot_mut(rid.slot_id)
            .copy_from_slice(&bytes);
        Ok(())
    }

    /// Every data page, free list first, then full list, each head to tail.
    pub fn page_ids(&self) -> Result<Vec<PageId>> {
        let mut pages = self.list_pages(PageList::Free)?;
        pages.extend(self.list_pages(PageList::Full)?);
        Ok(pages)
    }

    /// Pages of one list, head to tail.
    pub fn list_pages(&self, list: PageList) -> Result<Vec<PageId>> {
        let mut pages = Vec::new();
        let mut current = self.head(list)?;
        while let Some(page_id) = current {
            pages.push(page_id);
            let guard = self.bpm.read_page(page_id)?;
            current = DataPageRef::new(guard.data(), self.layout).next();
        }
        Ok(pages)
    }

    pub fn data_page_count(&self) -> Result<usize> {
        Ok(self.page_ids()?.len())
    }

    /// Decodes every stored record in page order.
    pub fn get_all_records(&self) -> Result<Vec<Record>> {
        Ok(self
            .records_with_ids()?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// Decodes every stored record together with its address.
    pub fn records_with_ids(&self) -> Result<Vec<(RecordId, Record)>> {
        let mut records = Vec::new();
        for page_id in self.page_ids()? {
            let guard = self.bpm.read_page(page_id)?;
            let view = DataPageRef::new(guard.data(), self.layout);
            for slot_id in view.occupied_slots() {
                let record = RecordCodec::decode(&self.schema, view.slot(slot_id))?;
                records.push((RecordId::new(page_id, slot_id), record));
            }
        }
        Ok(records)
    }

    /// Deallocates every data page and the header page.
    pub fn destroy(&self) -> Result<()> {
        let pages = self.page_ids()?;
        for &page_id in &pages {
            self.bpm.delete_page(page_id)?;
        }
        self.bpm.delete_page(self.header_page_id)?;
        info!(
            "dropped relation {} ({} data pages released)",
            self.name,
            pages.len()
        );
        Ok(())
    }

    fn head(&self, list: PageList) -> Result<Option<PageId>> {
        let guard = self.bpm.read_page(self.header_page_id)?;
        Ok(HeaderPageRef::new(guard.data()).head(list))
    }

    fn set_head(&self, list: PageList, head: Option<PageId>) -> Result<()> {
        let mut guard = self.bpm.write_page(self.header_page_id)?;
        HeaderPage::new(guard.data_mut()).set_head(list, head);
        Ok(())
    }

    /// Walks the free list for a page with an empty slot.
    fn find_free_slot(&self) -> Result<Option<(PageId, SlotId)>> {
        let mut current = self.head(PageList::Free)?;
        while let Some(page_id) = current {
            let guard = self.bpm.read_page(page_id)?;
            let view = DataPageRef::new(guard.data(), self.layout);
            if let Some(slot_id) = view.first_free_slot() {
                return Ok(Some((page_id, slot_id)));
            }
            current = view.next();
        }
        Ok(None)
    }

    /// Allocates and initializes a data page at the head of the free list.
    fn add_data_page(&self) -> Result<PageId> {
        let page_id = self.bpm.new_page()?;
        {
            let mut guard = self.bpm.write_page(page_id)?;
            DataPage::new(guard.data_mut(), self.layout).init();
        }
        self.push_front(PageList::Free, page_id)?;
        debug!("{}: added data page {}", self.name, page_id);
        Ok(page_id)
    }

    /// Links a page at the head of a list.
    fn push_front(&self, list: PageList, page_id: PageId) -> Result<()> {
        let old_head = self.head(list)?;
        {
            let mut guard = self.bpm.write_page(page_id)?;
            let mut page = DataPage::new(guard.data_mut(), self.layout);
            page.set_prev(None);
            page.set_next(old_head);
        }
        if let Some(old_head) = old_head {
            let mut guard = self.bpm.write_page(old_head)?;
            DataPage::new(guard.data_mut(), self.layout).set_prev(Some(page_id));
        }
        self.set_head(list, Some(page_id))
    }

    /// Removes a page from a list, patching its neighbours or the list head.
    fn unlink(&self, list: PageList, page_id: PageId) -> Result<()> {
        let (prev, next) = {
            let guard = self.bpm.read_page(page_id)?;
            let view = DataPageRef::new(guard.data(), self.layout);
            (view.prev(), view.next())
        };

        match prev {
            Some(prev) => {
                let mut guard = self.bpm.write_page(prev)?;
                DataPage::new(guard.data_mut(), self.layout).set_next(next);
            }
            None => self.set_head(list, next)?,
        }
        if let Some(next) = next {
            let mut guard = self.bpm.write_page(next)?;
            DataPage::new(guard.data_mut(), self.layout).set_prev(prev);
        }

        let mut guard = self.bpm.write_page(page_id)?;
        let mut page = DataPage::new(guard.data_mut(), self.layout);
        page.set_prev(None);
        page.set_next(None);
        Ok(())
    }
}
