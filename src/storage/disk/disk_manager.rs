use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, info};
use parking_lot::Mutex;

use crate::common::{
    DbConfig, HeapDbError, PageId, Result, BITMAP_SIZE, MAX_PAGES_PER_FILE,
};

use super::PageBitmap;

/// Returns the file name used for the data file with the given index.
pub fn data_file_name(file_idx: u32) -> String {
    format!("Data{}.bin", file_idx)
}

/// One backing file: a 64-byte occupancy bitmap followed by fixed-size pages.
struct DataFile {
    path: PathBuf,
    /// Opened lazily; a missing file behaves as an empty one
    handle: Option<File>,
    bitmap: PageBitmap,
    /// Number of pages physically present in the file
    page_count: u32,
}

impl DataFile {
    fn load(path: PathBuf, page_size: usize) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path,
                handle: None,
                bitmap: PageBitmap::new(),
                page_count: 0,
            });
        }

        let mut handle = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = handle.metadata()?.len();

        let mut header = [0u8; BITMAP_SIZE];
        if len >= BITMAP_SIZE as u64 {
            handle.read_exact(&mut header)?;
        }
        let page_count = (len.saturating_sub(BITMAP_SIZE as u64) / page_size as u64)
            .min(MAX_PAGES_PER_FILE as u64) as u32;

        Ok(Self {
            path,
            handle: Some(handle),
            bitmap: PageBitmap::from_bytes(&header),
            page_count,
        })
    }

    /// Returns the open handle, creating the file with an empty header if needed.
    fn handle(&mut self) -> Result<&mut File> {
        let file = match self.handle.take() {
            Some(file) => file,
            None => {
                let mut file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&self.path)?;
                if file.metadata()?.len() < BITMAP_SIZE as u64 {
                    file.seek(SeekFrom::Start(0))?;
                    file.write_all(self.bitmap.as_bytes())?;
                }
                debug!("created data file {}", self.path.display());
                file
            }
        };
        Ok(self.handle.insert(file))
    }

    fn write_bitmap(&mut self) -> Result<()> {
        let bits = *self.bitmap.as_bytes();
        let file = self.handle()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bits)?;
        Ok(())
    }

    fn has_page(&self, page_idx: u32) -> bool {
        page_idx < self.page_count
    }
}

fn page_offset(page_idx: u32, page_size: usize) -> u64 {
    BITMAP_SIZE as u64 + page_idx as u64 * page_size as u64
}

/// DiskManager allocates, deallocates, reads and writes whole pages spread over
/// a bounded set of data files in the database directory.
pub struct DiskManager {
    /// Directory holding the data files
    db_path: PathBuf,
    /// Size of each page in bytes
    page_size: usize,
    /// Upper bound on the number of data files
    max_file_count: usize,
    /// One entry per potential data file, index = file index
    files: Mutex<Vec<DataFile>>,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the data files under `db_path`, loading every existing bitmap.
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Path>>(db_path: P, page_size: usize, max_file_count: usize) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        fs::create_dir_all(&db_path)?;

        let mut files = Vec::with_capacity(max_file_count);
        for file_idx in 0..max_file_count as u32 {
            files.push(DataFile::load(
                db_path.join(data_file_name(file_idx)),
                page_size,
            )?);
        }

        let used: u32 = files.iter().map(|f| f.bitmap.used_count()).sum();
        info!(
            "opened {} ({} files max, {}-byte pages, {} pages in use)",
            db_path.display(),
            max_file_count,
            page_size,
            used
        );

        Ok(Self {
            db_path,
            page_size,
            max_file_count,
            files: Mutex::new(files),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Opens the allocator described by a configuration.
    pub fn from_config(config: &DbConfig) -> Result<Self> {
        config.validate()?;
        Self::new(&config.db_path, config.page_size, config.max_file_count)
    }

    /// Allocates a page and returns its ID.
    ///
    /// A free page inside an existing file is reused first. Otherwise a zero-filled
    /// page is appended to the first file with room, creating files as needed.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut files = self.files.lock();

        for (file_idx, file) in files.iter_mut().enumerate() {
            if let Some(page_idx) = file.bitmap.first_free_below(file.page_count) {
                file.bitmap.set(page_idx);
                file.write_bitmap()?;
                let page_id = PageId::new(file_idx as u32, page_idx);
                debug!("reused {}", page_id);
                return Ok(page_id);
            }
        }

        let zeros = vec![0u8; self.page_size];
        for (file_idx, file) in files.iter_mut().enumerate() {
            if file.page_count >= MAX_PAGES_PER_FILE {
                continue;
            }

            let page_idx = file.page_count;
            let handle = file.handle()?;
            handle.seek(SeekFrom::Start(page_offset(page_idx, self.page_size)))?;
            handle.write_all(&zeros)?;

            file.page_count += 1;
            file.bitmap.set(page_idx);
            file.write_bitmap()?;

            let page_id = PageId::new(file_idx as u32, page_idx);
            debug!("appended {}", page_id);
            return Ok(page_id);
        }

        Err(HeapDbError::CapacityExceeded {
            max_files: self.max_file_count,
        })
    }

    /// Marks a page free so that a later allocation can reuse it.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        let mut files = self.files.lock();
        let file = files
            .get_mut(page_id.file_idx as usize)
            .filter(|f| f.has_page(page_id.page_idx))
            .ok_or(HeapDbError::PageNotFound(page_id))?;

        file.bitmap.clear(page_id.page_idx);
        file.write_bitmap()?;
        debug!("deallocated {}", page_id);
        Ok(())
    }

    /// Reads a page from disk into the provided buffer.
    /// The buffer must be exactly one page long.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        self.check_len(data.len())?;

        let mut files = self.files.lock();
        let file = files
            .get_mut(page_id.file_idx as usize)
            .filter(|f| f.has_page(page_id.page_idx))
            .ok_or(HeapDbError::PageNotFound(page_id))?;

        let handle = file.handle()?;
        handle.seek(SeekFrom::Start(page_offset(page_id.page_idx, self.page_size)))?;
        handle.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page to disk from the provided buffer.
    /// The buffer must be exactly one page long.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        self.check_len(data.len())?;

        let mut files = self.files.lock();
        let file = files
            .get_mut(page_id.file_idx as usize)
            .filter(|f| f.has_page(page_id.page_idx))
            .ok_or(HeapDbError::PageNotFound(page_id))?;

        let handle = file.handle()?;
        handle.seek(SeekFrom::Start(page_offset(page_id.page_idx, self.page_size)))?;
        handle.write_all(data)?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes every in-memory bitmap back to its file header and syncs the files.
    pub fn shutdown(&self) -> Result<()> {
        let mut files = self.files.lock();
        for file in files.iter_mut().filter(|f| f.handle.is_some()) {
            file.write_bitmap()?;
            file.handle()?.sync_all()?;
        }
        info!("disk manager for {} shut down", self.db_path.display());
        Ok(())
    }

    /// Returns whether the page's occupancy bit is set.
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        self.files
            .lock()
            .get(page_id.file_idx as usize)
            .map_or(false, |f| f.bitmap.is_set(page_id.page_idx))
    }

    /// Returns the number of pages physically present in a data file.
    pub fn page_count(&self, file_idx: u32) -> u32 {
        self.files
            .lock()
            .get(file_idx as usize)
            .map_or(0, |f| f.page_count)
    }

    /// Returns the number of pages currently marked used across all files.
    pub fn allocated_page_count(&self) -> u32 {
        self.files.lock().iter().map(|f| f.bitmap.used_count()).sum()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_file_count(&self) -> usize {
        self.max_file_count
    }

    /// Returns the number of disk reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of disk writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the database directory.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        if actual != self.page_size {
            return Err(HeapDbError::SizeMismatch {
                expected: self.page_size,
                actual,
            });
        }
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        for file in self.files.get_mut().iter_mut() {
            if let Some(handle) = file.handle.as_mut() {
                let _ = handle.sync_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_disk_manager_new_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        let dm = DiskManager::new(&path, 64, 2).unwrap();

        assert!(path.is_dir());
        assert_eq!(dm.allocated_page_count(), 0);
        assert_eq!(dm.page_count(0), 0);
    }

    #[test]
    fn test_disk_manager_allocate_page() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::new(dir.path(), 64, 2).unwrap();

        let page_id = dm.allocate_page().unwrap();
        assert_eq!(page_id, PageId::new(0, 0));
        assert!(dm.is_allocated(page_id));

        let page_id2 = dm.allocate_page().unwrap();
        assert_eq!(page_id2, PageId::new(0, 1));
        assert_eq!(dm.page_count(0), 2);

        let len = fs::metadata(dir.path().join("Data0.bin")).unwrap().len();
        assert_eq!(len, (BITMAP_SIZE + 2 * 64) as u64);
    }

    #[test]
    fn test_disk_manager_read_write() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::new(dir.path(), 128, 1).unwrap();

        let page_id = dm.allocate_page().unwrap();

        let mut write_data = [0u8; 128];
        write_data[0] = 42;
        write_data[100] = 255;
        write_data[127] = 128;
        dm.write_page(page_id, &write_data).unwrap();

        let mut read_data = [0u8; 128];
        dm.read_page(page_id, &mut read_data).unwrap();

        assert_eq!(read_data, write_data);
        assert_eq!(dm.get_num_reads(), 1);
        assert_eq!(dm.get_num_writes(), 1);
    }

    #[test]
    fn test_disk_manager_size_mismatch() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::new(dir.path(), 128, 1).unwrap();
        let page_id = dm.allocate_page().unwrap();

        let mut short = [0u8; 64];
        assert!(matches!(
            dm.read_page(page_id, &mut short),
            Err(HeapDbError::SizeMismatch { expected: 128, actual: 64 })
        ));
        assert!(matches!(
            dm.write_page(page_id, &[0u8; 129]),
            Err(HeapDbError::SizeMismatch { expected: 128, actual: 129 })
        ));
    }

    #[test]
    fn test_disk_manager_page_not_found() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::new(dir.path(), 64, 2).unwrap();
        dm.allocate_page().unwrap();

        let mut buf = [0u8; 64];
        assert!(matches!(
            dm.read_page(PageId::new(0, 1), &mut buf),
            Err(HeapDbError::PageNotFound(_))
        ));
        assert!(matches!(
            dm.read_page(PageId::new(1, 0), &mut buf),
            Err(HeapDbError::PageNotFound(_))
        ));
        assert!(matches!(
            dm.deallocate_page(PageId::new(7, 0)),
            Err(HeapDbError::PageNotFound(_))
        ));
    }

    #[test]
    fn test_disk_manager_persistence() {
        let dir = tempdir().unwrap();

        {
            let dm = DiskManager::new(dir.path(), 64, 2).unwrap();
            let page_id = dm.allocate_page().unwrap();
            dm.allocate_page().unwrap();
            let mut data = [0u8; 64];
            data[0] = 123;
            dm.write_page(page_id, &data).unwrap();
            dm.deallocate_page(PageId::new(0, 1)).unwrap();
            dm.shutdown().unwrap();
        }

        {
            let dm = DiskManager::new(dir.path(), 64, 2).unwrap();
            assert_eq!(dm.page_count(0), 2);
            assert!(dm.is_allocated(PageId::new(0, 0)));
            assert!(!dm.is_allocated(PageId::new(0, 1)));

            let mut data = [0u8; 64];
            dm.read_page(PageId::new(0, 0), &mut data).unwrap();
            assert_eq!(data[0], 123);
        }
    }
}
