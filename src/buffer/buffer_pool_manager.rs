use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::common::{FrameId, HeapDbError, PageId, Result};
use crate::storage::disk::DiskManager;

use super::{
    FrameHeader, ReadPageGuard, ReleaseCallback, ReplacementPolicy, Replacer, WritePageGuard,
};

/// Internal state shared with the release callbacks of outstanding guards
struct BufferPoolState {
    /// The buffer pool frames
    frames: Vec<Arc<FrameHeader>>,
    /// Page table: maps page IDs to frame IDs
    page_table: Mutex<HashMap<PageId, FrameId>>,
    /// Free list: frames that hold no page
    free_list: Mutex<VecDeque<FrameId>>,
    /// Victim selection among unpinned frames
    replacer: Replacer,
    /// Backing page store
    disk_manager: Arc<DiskManager>,
}

impl BufferPoolState {
    /// Decrements the pin count of a resident page, ORing in the dirty flag.
    /// Returns false if the page is not resident or not pinned.
    fn unpin(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.release(page_id, is_dirty, true)
    }

    /// Gives back a pin taken by a request that failed, leaving the access
    /// stamp alone.
    fn release_failed_pin(&self, page_id: PageId) {
        self.release(page_id, false, false);
    }

    fn release(&self, page_id: PageId, is_dirty: bool, stamp: bool) -> bool {
        let page_table = self.page_table.lock();
        let Some(&frame_id) = page_table.get(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id.as_usize()];
        let Some(remaining) = frame.unpin() else {
            return false;
        };
        if is_dirty {
            frame.set_dirty(true);
        }
        if stamp {
            self.replacer.record_access(frame_id);
        }
        if remaining == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }
}

/// BufferPoolManager caches a bounded number of pages in memory. Every access
/// goes through a page guard that pins the page for the guard's lifetime; only
/// unpinned frames are considered for eviction, using an LRU or MRU policy.
pub struct BufferPoolManager {
    /// Number of frames in the buffer pool
    pool_size: usize,
    /// Shared state
    state: Arc<BufferPoolState>,
}

impl BufferPoolManager {
    /// Creates a new BufferPoolManager with the given pool size, eviction policy
    /// and disk manager. Frames are sized to the disk manager's page size.
    pub fn new(pool_size: usize, policy: ReplacementPolicy, disk_manager: Arc<DiskManager>) -> Self {
        let page_size = disk_manager.page_size();
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(FrameHeader::new(frame_id, page_size)));
            free_list.push_back(frame_id);
        }

        let state = Arc::new(BufferPoolState {
            frames,
            page_table: Mutex::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Replacer::new(policy, pool_size),
            disk_manager,
        });

        Self { pool_size, state }
    }

    /// Allocates a page on disk and installs it in a frame, zero-filled and dirty.
    /// The page is left unpinned; take a guard to access it.
    pub fn new_page(&self) -> Result<PageId> {
        let frame_id = self.acquire_frame()?;
        let frame = &self.state.frames[frame_id.as_usize()];

        let page_id = match self.state.disk_manager.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                self.state.free_list.lock().push_back(frame_id);
                return Err(e);
            }
        };

        frame.set_page_id(Some(page_id));
        frame.set_dirty(true);
        self.state.page_table.lock().insert(page_id, frame_id);

        self.state.replacer.record_access(frame_id);
        self.state.replacer.set_evictable(frame_id, true);

        Ok(page_id)
    }

    /// Drops a page from the pool and deallocates it on disk.
    /// Returns whether the page was resident. Fails if the page is pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let was_resident = {
            let mut page_table = self.state.page_table.lock();
            match page_table.get(&page_id).copied() {
                Some(frame_id) => {
                    let frame = &self.state.frames[frame_id.as_usize()];
                    if frame.pin_count() > 0 {
                        return Err(HeapDbError::PageStillPinned(page_id));
                    }

                    page_table.remove(&page_id);
                    frame.reset();
                    self.state.replacer.remove(frame_id);
                    self.state.free_list.lock().push_back(frame_id);
                    true
                }
                None => false,
            }
        };

        self.state.disk_manager.deallocate_page(page_id)?;
        Ok(was_resident)
    }

    /// Pins a page for shared read access.
    pub fn read_page(&self, page_id: PageId) -> Result<ReadPageGuard> {
        let frame = self.fetch_page(page_id)?;
        match frame.try_read_latch() {
            Some(latch) => {
                self.state.replacer.record_access(frame.frame_id());
                Ok(ReadPageGuard::new(page_id, latch, self.release_callback()))
            }
            None => {
                self.state.release_failed_pin(page_id);
                Err(HeapDbError::PageLatched(page_id))
            }
        }
    }

    /// Pins a page for exclusive write access.
    pub fn write_page(&self, page_id: PageId) -> Result<WritePageGuard> {
        let frame = self.fetch_page(page_id)?;
        match frame.try_write_latch() {
            Some(latch) => {
                self.state.replacer.record_access(frame.frame_id());
                Ok(WritePageGuard::new(page_id, latch, self.release_callback()))
            }
            None => {
                self.state.release_failed_pin(page_id);
                Err(HeapDbError::PageLatched(page_id))
            }
        }
    }

    /// Releases one pin on a resident page; `is_dirty` marks it modified.
    /// Never performs I/O. Returns false if the page was not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.state.unpin(page_id, is_dirty)
    }

    /// Writes a resident page back to disk without evicting it.
    /// Returns false if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let page_table = self.state.page_table.lock();

        if let Some(&frame_id) = page_table.get(&page_id) {
            let frame = &self.state.frames[frame_id.as_usize()];
            let data = frame
                .try_read_latch()
                .ok_or(HeapDbError::PageLatched(page_id))?;

            self.state.disk_manager.write_page(page_id, &data)?;
            frame.set_dirty(false);

            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Writes every dirty page back, then empties the pool.
    ///
    /// This is not an unconditional flush: while any page is pinned it returns
    /// [`HeapDbError::PageStillPinned`] without writing or resetting any frame.
    /// Drop every guard first.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut page_table = self.state.page_table.lock();

        if let Some((&page_id, _)) = page_table
            .iter()
            .find(|(_, frame_id)| self.state.frames[frame_id.as_usize()].pin_count() > 0)
        {
            return Err(HeapDbError::PageStillPinned(page_id));
        }

        for frame in &self.state.frames {
            if let Some(page_id) = frame.page_id().filter(|_| frame.is_dirty()) {
                frame.with_data(|data| self.state.disk_manager.write_page(page_id, data))?;
                frame.set_dirty(false);
            }
        }

        for frame in &self.state.frames {
            frame.reset();
        }
        page_table.clear();
        self.state.replacer.clear();

        let mut free_list = self.state.free_list.lock();
        free_list.clear();
        free_list.extend(self.state.frames.iter().map(|f| f.frame_id()));

        debug!("flushed and emptied {} frames", self.pool_size);
        Ok(())
    }

    /// Returns the pin count for a page, or None if it isn't resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let page_table = self.state.page_table.lock();

        page_table
            .get(&page_id)
            .map(|&frame_id| self.state.frames[frame_id.as_usize()].pin_count())
    }

    /// Returns the dirty flag of a page, or None if it isn't resident.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let page_table = self.state.page_table.lock();

        page_table
            .get(&page_id)
            .map(|&frame_id| self.state.frames[frame_id.as_usize()].is_dirty())
    }

    /// Returns whether a page currently occupies a frame.
    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.state.page_table.lock().contains_key(&page_id)
    }

    /// Returns the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of free frames.
    pub fn free_frame_count(&self) -> usize {
        self.state.free_list.lock().len()
    }

    pub fn page_size(&self) -> usize {
        self.state.disk_manager.page_size()
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.state.disk_manager
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.state.replacer.policy()
    }

    /// Switches the eviction policy for subsequent victim selections.
    pub fn set_policy(&self, policy: ReplacementPolicy) {
        self.state.replacer.set_policy(policy);
    }

    fn release_callback(&self) -> ReleaseCallback {
        let state = Arc::clone(&self.state);
        Box::new(move |page_id, is_dirty| {
            state.unpin(page_id, is_dirty);
        })
    }

    /// Pins a page, loading it from disk if it isn't resident. A page that was
    /// already resident is stamped by the caller once it holds the latch.
    fn fetch_page(&self, page_id: PageId) -> Result<Arc<FrameHeader>> {
        {
            let page_table = self.state.page_table.lock();
            if let Some(&frame_id) = page_table.get(&page_id) {
                let frame = &self.state.frames[frame_id.as_usize()];
                frame.pin();
                self.state.replacer.set_evictable(frame_id, false);
                return Ok(Arc::clone(frame));
            }
        }

        let frame_id = self.acquire_frame()?;
        let frame = &self.state.frames[frame_id.as_usize()];

        if let Err(e) =
            frame.with_data_mut(|data| self.state.disk_manager.read_page(page_id, data))
        {
            frame.reset();
            self.state.free_list.lock().push_back(frame_id);
            return Err(e);
        }

        frame.set_page_id(Some(page_id));
        frame.set_dirty(false);
        frame.pin();
        self.state.page_table.lock().insert(page_id, frame_id);

        self.state.replacer.record_access(frame_id);
        self.state.replacer.set_evictable(frame_id, false);

        Ok(Arc::clone(frame))
    }

    /// Takes a free frame, or evicts a victim chosen by the replacer.
    /// A dirty victim is written back first. The returned frame is empty.
    fn acquire_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.state.free_list.lock().pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self
            .state
            .replacer
            .evict()
            .ok_or(HeapDbError::PoolSaturated)?;
        let frame = &self.state.frames[frame_id.as_usize()];

        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                let written =
                    frame.with_data(|data| self.state.disk_manager.write_page(old_page_id, data));
                if let Err(e) = written {
                    // keep the victim resident and evictable
                    self.state.replacer.record_access(frame_id);
                    self.state.replacer.set_evictable(frame_id, true);
                    return Err(e);
                }
                debug!("wrote back {} from {}", old_page_id, frame_id);
            }
            self.state.page_table.lock().remove(&old_page_id);
            debug!("evicted {} from {}", old_page_id, frame_id);
        }

        frame.reset();
        Ok(frame_id)
    }
}
