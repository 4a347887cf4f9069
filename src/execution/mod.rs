//! Pull-based record iterators.
//!
//! Operators are composed by ownership: a [`SelectOperator`] or
//! [`ProjectOperator`] owns the iterator beneath it, and every chain bottoms
//! out in a [`RelationScanner`] borrowing a heap relation. Each call to
//! [`RecordIterator::next`] produces at most one record.

mod condition;
mod project;
mod scan;
mod select;

pub use condition::*;
pub use project::*;
pub use scan::*;
pub use select::*;

use crate::common::Result;
use crate::tuple::Record;

/// Cursor protocol shared by every operator.
pub trait RecordIterator {
    /// Returns the next record, or None once the stream is exhausted.
    fn next(&mut self) -> Result<Option<Record>>;

    /// Releases any page the iterator holds. Later calls to `next` return None
    /// until the iterator is reset.
    fn close(&mut self);

    /// Rewinds to the first record.
    fn reset(&mut self) -> Result<()>;

    /// Drains the remaining records.
    fn collect_records(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next()? {
            records.push(record);
        }
        Ok(records)
    }
}

impl<I: RecordIterator + ?Sized> RecordIterator for Box<I> {
    fn next(&mut self) -> Result<Option<Record>> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
}
