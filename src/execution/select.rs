use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Record, Schema};

use super::{Condition, RecordIterator};

/// Passes through the child's records that satisfy every condition.
pub struct SelectOperator<C> {
    child: C,
    /// Layout of the child's records, for column types
    schema: Arc<Schema>,
    /// Conjunction of conditions
    conditions: Vec<Condition>,
}

impl<C: RecordIterator> SelectOperator<C> {
    pub fn new(child: C, schema: Arc<Schema>, conditions: Vec<Condition>) -> Self {
        Self {
            child,
            schema,
            conditions,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn matches(&self, record: &Record) -> Result<bool> {
        for condition in &self.conditions {
            if !condition.evaluate(record, &self.schema)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<C: RecordIterator> RecordIterator for SelectOperator<C> {
    fn next(&mut self) -> Result<Option<Record>> {
        while let Some(record) = self.child.next()? {
            match self.matches(&record) {
                Ok(true) => return Ok(Some(record)),
                Ok(false) => {}
                Err(e) => {
                    self.child.close();
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn reset(&mut self) -> Result<()> {
        self.child.reset()
    }
}
