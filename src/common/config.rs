use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::buffer::ReplacementPolicy;

use super::error::{HeapDbError, Result};

/// Default size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Size of the occupancy bitmap at the start of every data file
pub const BITMAP_SIZE: usize = 64;

/// Maximum number of pages one data file can hold (one bitmap bit per page)
pub const MAX_PAGES_PER_FILE: u32 = (BITMAP_SIZE * 8) as u32;

/// Default number of data files the allocator may create
pub const DEFAULT_MAX_FILE_COUNT: usize = 4;

/// Default buffer pool size (number of frames)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 16;

/// Name of the catalog file kept in the database directory
pub const CATALOG_FILE_NAME: &str = "database.save";

/// Smallest page that can hold a data-page link plus one slot and its bytemap entry
const MIN_PAGE_SIZE: usize = 18;

/// Runtime configuration of a database instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Directory holding the data files and the catalog
    pub db_path: PathBuf,
    /// Page size in bytes
    pub page_size: usize,
    /// Upper bound on the number of data files
    pub max_file_count: usize,
    /// Number of buffer pool frames
    pub buffer_count: usize,
    /// Eviction policy of the buffer pool
    pub policy: ReplacementPolicy,
}

impl DbConfig {
    /// Creates a configuration rooted at `db_path` with default sizes.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            buffer_count: DEFAULT_BUFFER_POOL_SIZE,
            policy: ReplacementPolicy::Lru,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_file_count(mut self, max_file_count: usize) -> Self {
        self.max_file_count = max_file_count;
        self
    }

    pub fn with_buffer_count(mut self, buffer_count: usize) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    pub fn with_policy(mut self, policy: ReplacementPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Loads a configuration file in the `key = value` text format.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            HeapDbError::ConfigInvalid(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        text.parse()
    }

    /// Checks that the sizes describe a usable engine.
    pub fn validate(&self) -> Result<()> {
        if self.page_size < MIN_PAGE_SIZE {
            return Err(HeapDbError::ConfigInvalid(format!(
                "pagesize must be at least {} bytes, got {}",
                MIN_PAGE_SIZE, self.page_size
            )));
        }
        if self.max_file_count == 0 {
            return Err(HeapDbError::ConfigInvalid(
                "dm_maxfilecount must be positive".to_string(),
            ));
        }
        if self.buffer_count == 0 {
            return Err(HeapDbError::ConfigInvalid(
                "bm_buffercount must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the catalog file for this database.
    pub fn catalog_path(&self) -> PathBuf {
        self.db_path.join(CATALOG_FILE_NAME)
    }
}

impl FromStr for DbConfig {
    type Err = HeapDbError;

    fn from_str(s: &str) -> Result<Self> {
        let mut db_path = None;
        let mut page_size = None;
        let mut max_file_count = None;
        let mut buffer_count = None;
        let mut policy = None;

        for (line_no, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(HeapDbError::ConfigInvalid(format!(
                    "line {}: expected `key = value`, got `{}`",
                    line_no + 1,
                    line
                )));
            };
            let key = key.trim();
            let value = unquote(value.trim());

            match key {
                "dbpath" => db_path = Some(PathBuf::from(value)),
                "pagesize" => page_size = Some(parse_positive(key, value)?),
                "dm_maxfilecount" => max_file_count = Some(parse_positive(key, value)?),
                "bm_buffercount" => buffer_count = Some(parse_positive(key, value)?),
                "bm_policy" => policy = Some(value.parse::<ReplacementPolicy>()?),
                _ => log::warn!("ignoring unknown configuration key `{}`", key),
            }
        }

        let missing = |key: &str| HeapDbError::ConfigInvalid(format!("missing `{}`", key));
        let config = DbConfig {
            db_path: db_path.ok_or_else(|| missing("dbpath"))?,
            page_size: page_size.ok_or_else(|| missing("pagesize"))?,
            max_file_count: max_file_count.ok_or_else(|| missing("dm_maxfilecount"))?,
            buffer_count: buffer_count.unwrap_or(DEFAULT_BUFFER_POOL_SIZE),
            policy: policy.unwrap_or(ReplacementPolicy::Lru),
        };
        config.validate()?;
        Ok(config)
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(HeapDbError::ConfigInvalid(format!(
            "`{}` must be a positive integer, got `{}`",
            key, value
        ))),
    }
}
