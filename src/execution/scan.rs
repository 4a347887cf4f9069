use crate::buffer::ReadPageGuard;
use crate::common::{PageId, Result};
use crate::heap::HeapRelation;
use crate::storage::page::DataPageRef;
use crate::tuple::{Record, RecordCodec};

use super::RecordIterator;

/// Full scan over a relation's occupied slots.
///
/// The page list is snapshotted on construction and on reset. At most one page
/// is pinned at a time; it is released as soon as its last slot is consumed.
pub struct RelationScanner<'a> {
    relation: &'a HeapRelation,
    /// Pages to visit, in scan order
    pages: Vec<PageId>,
    /// Index into `pages` of the current page
    page_idx: usize,
    /// First slot of the current page not yet examined
    next_slot: usize,
    /// Pin on the current page
    current: Option<ReadPageGuard>,
}

impl<'a> RelationScanner<'a> {
    pub fn new(relation: &'a HeapRelation) -> Result<Self> {
        Ok(Self {
            relation,
            pages: relation.page_ids()?,
            page_idx: 0,
            next_slot: 0,
            current: None,
        })
    }

    /// Returns the page currently pinned by the scan, if any.
    pub fn pinned_page(&self) -> Option<PageId> {
        self.current.as_ref().map(|guard| guard.page_id())
    }

    pub fn relation(&self) -> &'a HeapRelation {
        self.relation
    }
}

impl RecordIterator for RelationScanner<'_> {
    fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if self.current.is_none() {
                let Some(&page_id) = self.pages.get(self.page_idx) else {
                    return Ok(None);
                };
                self.current = Some(self.relation.buffer_pool().read_page(page_id)?);
                self.next_slot = 0;
            }
            let Some(guard) = &self.current else {
                return Ok(None);
            };

            let view = DataPageRef::new(guard.data(), self.relation.layout());
            let Some(slot_id) = view.next_occupied_slot(self.next_slot) else {
                self.current = None;
                self.page_idx += 1;
                continue;
            };
            self.next_slot = slot_id.as_usize() + 1;

            return match RecordCodec::decode(self.relation.schema(), view.slot(slot_id)) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    self.close();
                    Err(e)
                }
            };
        }
    }

    fn close(&mut self) {
        self.current = None;
        self.page_idx = self.pages.len();
    }

    fn reset(&mut self) -> Result<()> {
        self.current = None;
        self.pages = self.relation.page_ids()?;
        self.page_idx = 0;
        self.next_slot = 0;
        Ok(())
    }
}
