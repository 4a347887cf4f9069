use thiserror::Error;

use super::types::PageId;
use crate::tuple::DataType;

/// Database error types
#[derive(Error, Debug)]
pub enum HeapDbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("{0} not found")]
    PageNotFound(PageId),

    #[error("Storage capacity exceeded: all {max_files} data files are full")]
    CapacityExceeded { max_files: usize },

    #[error("Buffer pool is saturated, no unpinned frames available")]
    PoolSaturated,

    #[error("{0} is still pinned")]
    PageStillPinned(PageId),

    #[error("{0} is latched by another guard")]
    PageLatched(PageId),

    #[error("Schema mismatch: expected {expected} values, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Cannot convert {value} to {target}")]
    ValueConversion { value: String, target: DataType },

    #[error("Unknown column type: {0}")]
    UnknownType(String),

    #[error("Record width {width} does not fit in a {page_size}-byte page")]
    RecordTooLarge { width: usize, page_size: usize },

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(u32),

    #[error("Slot {0} is empty")]
    EmptySlot(u32),

    #[error("{0} has no free slot")]
    PageFull(PageId),

    #[error("Unknown comparison operator: {0}")]
    UnknownOperator(String),

    #[error("Column index {index} out of range for {count} columns")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Table {0} already exists")]
    TableAlreadyExists(String),

    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Catalog corrupted: {0}")]
    CatalogCorrupted(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, HeapDbError>;
