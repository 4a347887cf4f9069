use std::fmt;

use crate::common::{HeapDbError, Result};

use super::Value;

/// An ordered sequence of values, positionally aligned with a relation's columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns the value at the given index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Replaces the value at the given index.
    /// Returns false if the index is out of bounds.
    pub fn set_value(&mut self, index: usize, value: Value) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Builds a new record from the listed column indices, in the listed order.
    /// Indices may repeat.
    pub fn project(&self, column_indices: &[usize]) -> Result<Record> {
        let values = column_indices
            .iter()
            .map(|&index| {
                self.values
                    .get(index)
                    .cloned()
                    .ok_or(HeapDbError::ColumnOutOfRange {
                        index,
                        count: self.values.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Record::new(values))
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Record::new(values)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ; ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new(vec![Value::Int(1), Value::from("Alice"), Value::Int(22)])
    }

    #[test]
    fn test_record_accessors() {
        let mut record = sample();
        assert_eq!(record.len(), 3);
        assert_eq!(record.value(1), Some(&Value::from("Alice")));
        assert_eq!(record.value(3), None);

        assert!(record.set_value(2, Value::Int(23)));
        assert!(!record.set_value(5, Value::Int(0)));
        assert_eq!(record.value(2), Some(&Value::Int(23)));
    }

    #[test]
    fn test_record_projection_reorders_and_duplicates() {
        let projected = sample().project(&[2, 0, 0]).unwrap();
        assert_eq!(
            projected.into_values(),
            vec![Value::Int(22), Value::Int(1), Value::Int(1)]
        );

        assert!(matches!(
            sample().project(&[3]),
            Err(HeapDbError::ColumnOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_record_display() {
        assert_eq!(sample().to_string(), "1 ; Alice ; 22");
        assert_eq!(Record::default().to_string(), "");
    }
}
