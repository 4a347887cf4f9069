use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::common::{HeapDbError, Result};
use crate::tuple::{DataType, Record, Schema, Value};

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }
}

impl FromStr for CompareOp {
    type Err = HeapDbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" => Ok(CompareOp::Eq),
            "<>" => Ok(CompareOp::Ne),
            "<" => Ok(CompareOp::Lt),
            ">" => Ok(CompareOp::Gt),
            "<=" => Ok(CompareOp::Le),
            ">=" => Ok(CompareOp::Ge),
            other => Err(HeapDbError::UnknownOperator(other.to_string())),
        }
    }
}

/// One side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Value of the column at this index
    Column(usize),
    /// Constant value
    Literal(Value),
}

impl Operand {
    fn resolve<'r>(&'r self, record: &'r Record) -> Result<&'r Value> {
        match self {
            Operand::Column(index) => {
                record
                    .value(*index)
                    .ok_or(HeapDbError::ColumnOutOfRange {
                        index: *index,
                        count: record.len(),
                    })
            }
            Operand::Literal(value) => Ok(value),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(index) => write!(f, "col[{}]", index),
            Operand::Literal(value) => write!(f, "{}", value),
        }
    }
}

/// Value domain in which both sides are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Integer,
    Float,
    Text,
}

impl Domain {
    fn of(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int => Domain::Integer,
            DataType::Float => Domain::Float,
            DataType::Char(_) | DataType::VarChar(_) => Domain::Text,
        }
    }

    /// Domain of two constants. Numeric literals always compare as integers,
    /// floats truncated toward zero; anything else compares as text.
    fn guess(left: &Value, right: &Value) -> Self {
        match (left, right) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => Domain::Integer,
            _ => Domain::Text,
        }
    }
}

/// `term OP term` where each term is a column reference or a literal.
///
/// Both sides are compared in the domain of the left column, else of the right
/// column. Two numeric literals compare as truncated integers, so `1.10 = 1.9`
/// holds and `2.5 < 2.7` does not.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    left: Operand,
    op: CompareOp,
    right: Operand,
}

impl Condition {
    pub fn new(left: Operand, op: CompareOp, right: Operand) -> Self {
        Self { left, op, right }
    }

    /// Shorthand for `col[index] OP value`.
    pub fn column_literal(index: usize, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::new(Operand::Column(index), op, Operand::Literal(value.into()))
    }

    pub fn left(&self) -> &Operand {
        &self.left
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn right(&self) -> &Operand {
        &self.right
    }

    /// Evaluates the condition against a record laid out by `schema`.
    pub fn evaluate(&self, record: &Record, schema: &Schema) -> Result<bool> {
        let left = self.left.resolve(record)?;
        let right = self.right.resolve(record)?;

        let domain = match (&self.left, &self.right) {
            (Operand::Column(index), _) | (_, Operand::Column(index)) => {
                let column = schema.column(*index).ok_or(HeapDbError::ColumnOutOfRange {
                    index: *index,
                    count: schema.column_count(),
                })?;
                Domain::of(column.data_type())
            }
            (Operand::Literal(_), Operand::Literal(_)) => Domain::guess(left, right),
        };

        let ordering = match domain {
            Domain::Integer => as_integer(left)?.cmp(&as_integer(right)?),
            Domain::Float => as_float(left)?.total_cmp(&as_float(right)?),
            Domain::Text => left.to_string().cmp(&right.to_string()),
        };
        Ok(self.op.accepts(ordering))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op.symbol(), self.right)
    }
}

fn as_integer(value: &Value) -> Result<i32> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Float(v) => Ok(*v as i32),
        Value::Text(s) => s.trim().parse().map_err(|_| HeapDbError::ValueConversion {
            value: s.clone(),
            target: DataType::Int,
        }),
    }
}

fn as_float(value: &Value) -> Result<f32> {
    match value {
        Value::Int(v) => Ok(*v as f32),
        Value::Float(v) => Ok(*v),
        Value::Text(s) => s.trim().parse().map_err(|_| HeapDbError::ValueConversion {
            value: s.clone(),
            target: DataType::Float,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::builder()
            .column("id", DataType::Int)
            .column("nom", DataType::Char(10))
            .column("moyenne", DataType::Float)
            .column("rang", DataType::Int)
            .build()
    }

    fn record() -> Record {
        Record::new(vec![
            Value::Int(7),
            Value::from("Bob"),
            Value::Float(12.5),
            Value::Int(7),
        ])
    }

    fn eval(condition: Condition) -> bool {
        condition.evaluate(&record(), &schema()).unwrap()
    }

    #[test]
    fn test_operators_on_int_column() {
        assert!(eval(Condition::column_literal(0, CompareOp::Eq, 7)));
        assert!(!eval(Condition::column_literal(0, CompareOp::Ne, 7)));
        assert!(eval(Condition::column_literal(0, CompareOp::Lt, 8)));
        assert!(eval(Condition::column_literal(0, CompareOp::Gt, 6)));
        assert!(eval(Condition::column_literal(0, CompareOp::Le, 7)));
        assert!(eval(Condition::column_literal(0, CompareOp::Ge, 7)));
        assert!(!eval(Condition::column_literal(0, CompareOp::Ge, 8)));
    }

    #[test]
    fn test_literal_coerced_to_column_domain() {
        // text literal compared as an integer because the column is INT
        assert!(eval(Condition::column_literal(0, CompareOp::Eq, "7")));
        // integer literal compared as a float
        assert!(eval(Condition::column_literal(2, CompareOp::Gt, 12)));
        assert!(eval(Condition::column_literal(1, CompareOp::Lt, "Charlie")));
    }

    #[test]
    fn test_literal_on_left_uses_right_column() {
        let condition = Condition::new(
            Operand::Literal(Value::Int(10)),
            CompareOp::Gt,
            Operand::Column(0),
        );
        assert!(eval(condition));
    }

    #[test]
    fn test_column_to_column() {
        let condition = Condition::new(Operand::Column(0), CompareOp::Eq, Operand::Column(3));
        assert!(eval(condition));
    }

    #[test]
    fn test_unconvertible_literal_fails() {
        let condition = Condition::column_literal(0, CompareOp::Eq, "seven");
        assert!(matches!(
            condition.evaluate(&record(), &schema()),
            Err(HeapDbError::ValueConversion { .. })
        ));
    }

    #[test]
    fn test_two_literals_guess_domain() {
        let lit = |token: &str| Operand::Literal(Value::guess(token));

        assert!(eval(Condition::new(lit("2"), CompareOp::Lt, lit("10"))));
        assert!(eval(Condition::new(lit("2.5"), CompareOp::Lt, lit("10"))));
        // floats are truncated before comparing
        assert!(!eval(Condition::new(lit("2.5"), CompareOp::Lt, lit("2.7"))));
        assert!(eval(Condition::new(lit("2.9"), CompareOp::Eq, lit("2"))));
        assert!(eval(Condition::new(lit("abc"), CompareOp::Lt, lit("abd"))));
        // mixed text and number falls back to string order
        assert!(eval(Condition::new(lit("10"), CompareOp::Lt, lit("9x"))));
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!("<>".parse::<CompareOp>().unwrap(), CompareOp::Ne);
        assert_eq!(">=".parse::<CompareOp>().unwrap(), CompareOp::Ge);
        assert!("!=".parse::<CompareOp>().is_err());
        assert_eq!(
            Condition::column_literal(1, CompareOp::Le, "x").to_string(),
            "col[1] <= x"
        );
    }
}
