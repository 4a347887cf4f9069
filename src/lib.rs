//! HeapDB - A page-based relational storage engine in Rust
//!
//! This crate stores fixed-width records in heap files laid out over numbered
//! data files, caches their pages in a bounded buffer pool and reads them back
//! through pull-based scan, select and project operators.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Storage Layer** (`storage`): Page allocation and page formats
//!   - `DiskManager`: Allocates, reads and writes pages across `Data{n}.bin` files
//!   - `PageBitmap`: Per-file occupancy bitmap
//!   - `HeaderPage`/`DataPage`: Heap relation page layouts
//!
//! - **Buffer Pool** (`buffer`): Memory management for database pages
//!   - `BufferPoolManager`: Fetches pages from disk and caches them in memory
//!   - `Replacer`: LRU or MRU victim selection among unpinned frames
//!   - `FrameHeader`: Per-frame metadata and data storage
//!   - `ReadPageGuard`/`WritePageGuard`: RAII guards that unpin on drop
//!
//! - **Records** (`tuple`): Column types, schemas, values and the record codec
//!
//! - **Heap** (`heap`): `HeapRelation`, a table stored as free and full page lists
//!
//! - **Execution** (`execution`): `RelationScanner`, `SelectOperator`, `ProjectOperator`
//!
//! - **Catalog** (`catalog`): `Database`, the table registry persisted in `database.save`
//!
//! # Example
//!
//! ```rust,no_run
//! use heapdb::catalog::Database;
//! use heapdb::common::DbConfig;
//! use heapdb::execution::{CompareOp, Condition, Projection};
//! use heapdb::tuple::{DataType, Record, Schema, Value};
//!
//! let mut db = Database::open(DbConfig::new("./heapdb_data")).unwrap();
//!
//! let schema = Schema::builder()
//!     .column("id", DataType::Int)
//!     .column("nom", DataType::Char(10))
//!     .build();
//! db.create_table("Etudiants", schema).unwrap();
//! db.insert("Etudiants", &Record::new(vec![Value::Int(1), Value::from("Alice")]))
//!     .unwrap();
//!
//! let rows = db
//!     .select(
//!         "Etudiants",
//!         vec![Condition::column_literal(0, CompareOp::Eq, 1)],
//!         Projection::Columns(vec![1]),
//!     )
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//!
//! db.finish().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod execution;
pub mod heap;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{HeapDbError, PageId, RecordId, Result, SlotId};
