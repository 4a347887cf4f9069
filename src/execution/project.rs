use crate::common::Result;
use crate::tuple::Record;

use super::RecordIterator;

/// Columns kept by a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every column, unchanged
    All,
    /// The listed column indices, in order; repeats allowed
    Columns(Vec<usize>),
}

/// Rebuilds each child record from a list of column indices.
pub struct ProjectOperator<C> {
    child: C,
    projection: Projection,
}

impl<C: RecordIterator> ProjectOperator<C> {
    pub fn new(child: C, projection: Projection) -> Self {
        Self { child, projection }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }
}

impl<C: RecordIterator> RecordIterator for ProjectOperator<C> {
    fn next(&mut self) -> Result<Option<Record>> {
        let Some(record) = self.child.next()? else {
            return Ok(None);
        };
        match &self.projection {
            Projection::All => Ok(Some(record)),
            Projection::Columns(indices) => match record.project(indices) {
                Ok(projected) => Ok(Some(projected)),
                Err(e) => {
                    self.child.close();
                    Err(e)
                }
            },
        }
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn reset(&mut self) -> Result<()> {
        self.child.reset()
    }
}
