use std::fmt;

use crate::common::{HeapDbError, Result};

use super::DataType;

/// A single field value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 32-bit signed integer
    Int(i32),

    /// 32-bit floating point
    Float(f32),

    /// String value (used for both Char and VarChar)
    Text(String),
}

impl Value {
    /// Converts this value to the representation stored in a column of type `target`.
    ///
    /// INT accepts integers and text holding an integer. FLOAT accepts floats,
    /// integers and numeric text. CHAR and VARCHAR accept text only.
    pub fn coerce_to(&self, target: &DataType) -> Result<Value> {
        let converted = match (self, target) {
            (Value::Int(v), DataType::Int) => Some(Value::Int(*v)),
            (Value::Text(s), DataType::Int) => s.trim().parse().ok().map(Value::Int),
            (Value::Float(v), DataType::Float) => Some(Value::Float(*v)),
            (Value::Int(v), DataType::Float) => Some(Value::Float(*v as f32)),
            (Value::Text(s), DataType::Float) => s.trim().parse().ok().map(Value::Float),
            (Value::Text(s), DataType::Char(_) | DataType::VarChar(_)) => {
                Some(Value::Text(s.clone()))
            }
            _ => None,
        };

        converted.ok_or_else(|| HeapDbError::ValueConversion {
            value: self.to_string(),
            target: target.clone(),
        })
    }

    /// Guesses the type of an unquoted literal token: a token with a decimal
    /// point is a float, otherwise an integer, and text when neither parses.
    pub fn guess(token: &str) -> Value {
        let token = token.trim();
        if token.contains('.') {
            if let Ok(v) = token.parse::<f32>() {
                return Value::Float(v);
            }
        } else if let Ok(v) = token.parse::<i32>() {
            return Value::Int(v);
        }
        Value::Text(token.to_string())
    }

    /// Parses a literal as written in a command: double-quoted tokens are text,
    /// anything else goes through [`Value::guess`].
    pub fn parse_literal(token: &str) -> Value {
        let token = token.trim();
        match token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
        {
            Some(text) => Value::Text(text.to_string()),
            None => Value::guess(token),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
