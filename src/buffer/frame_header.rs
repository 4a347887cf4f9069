use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};

use crate::common::{FrameId, HeapDbError, PageId, Result};

/// Shared read latch over a frame's bytes, owning a reference to the buffer.
pub type FrameReadLatch = ArcRwLockReadGuard<RawRwLock, Box<[u8]>>;

/// Exclusive write latch over a frame's bytes, owning a reference to the buffer.
pub type FrameWriteLatch = ArcRwLockWriteGuard<RawRwLock, Box<[u8]>>;

/// FrameHeader manages a single buffer frame in the buffer pool.
/// It stores metadata about the frame and the actual page data.
pub struct FrameHeader {
    /// The frame ID (index in the buffer pool)
    frame_id: FrameId,
    /// The page ID stored in this frame (None if empty)
    page_id: RwLock<Option<PageId>>,
    /// Pin count - number of holders currently accessing this frame
    pin_count: AtomicU32,
    /// Whether the page has been modified since being read from disk
    is_dirty: AtomicBool,
    /// The page bytes; page guards latch this directly
    data: Arc<RwLock<Box<[u8]>>>,
}

impl FrameHeader {
    /// Creates an empty frame holding `page_size` zero bytes.
    pub fn new(frame_id: FrameId, page_size: usize) -> Self {
        Self {
            frame_id,
            page_id: RwLock::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            data: Arc::new(RwLock::new(vec![0u8; page_size].into_boxed_slice())),
        }
    }

    /// Returns the frame ID.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the page ID stored in this frame.
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.read()
    }

    /// Sets the page ID stored in this frame.
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        *self.page_id.write() = page_id;
    }

    /// Returns the current pin count.
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count and returns the new value.
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count and returns the new value.
    /// Returns None if the pin count was already 0.
    pub fn unpin(&self) -> Option<u32> {
        self.pin_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
            .ok()
            .map(|prev| prev - 1)
    }

    /// Returns whether the page is dirty.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// Sets the dirty flag.
    pub fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Release);
    }

    /// Returns the frame's byte length.
    pub fn page_size(&self) -> usize {
        self.data.read().len()
    }

    /// Takes a shared latch on the page bytes without blocking.
    pub fn try_read_latch(&self) -> Option<FrameReadLatch> {
        self.data.try_read_arc()
    }

    /// Takes an exclusive latch on the page bytes without blocking.
    pub fn try_write_latch(&self) -> Option<FrameWriteLatch> {
        self.data.try_write_arc()
    }

    /// Copies data from the given slice into the frame.
    pub fn copy_from(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.data.write();
        check_len(guard.len(), data.len())?;
        guard.copy_from_slice(data);
        Ok(())
    }

    /// Copies data from the frame into the given slice.
    pub fn copy_to(&self, data: &mut [u8]) -> Result<()> {
        let guard = self.data.read();
        check_len(guard.len(), data.len())?;
        data.copy_from_slice(&guard);
        Ok(())
    }

    /// Runs `f` over the frame bytes under a shared latch.
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.data.read())
    }

    /// Runs `f` over the frame bytes under an exclusive latch.
    pub fn with_data_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Resets the frame to its initial state.
    pub fn reset(&self) {
        *self.page_id.write() = None;
        self.pin_count.store(0, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
        self.data.write().fill(0);
    }
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(HeapDbError::SizeMismatch { expected, actual });
    }
    Ok(())
}
