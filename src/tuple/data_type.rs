use std::fmt;
use std::str::FromStr;

use crate::common::HeapDbError;

/// Column types supported by the record codec.
/// Every type occupies a fixed number of bytes inside a record slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer: 4 bytes, big-endian
    Int,

    /// 32-bit floating point: 4 bytes, IEEE 754 big-endian
    Float,

    /// Fixed-length string: exactly n bytes, space-padded
    Char(u32),

    /// Bounded string: 4-byte length prefix + n bytes, space-padded
    VarChar(u32),
}

impl DataType {
    /// Returns the number of bytes a value of this type occupies in a record.
    pub fn width(&self) -> usize {
        match self {
            DataType::Int | DataType::Float => 4,
            DataType::Char(n) => *n as usize,
            DataType::VarChar(n) => 4 + *n as usize,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Char(_) | DataType::VarChar(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Char(n) => write!(f, "CHAR({})", n),
            DataType::VarChar(n) => write!(f, "VARCHAR({})", n),
        }
    }
}

impl FromStr for DataType {
    type Err = HeapDbError;

    /// Parses `INT`, `FLOAT`, `CHAR(n)` or `VARCHAR(n)`, ignoring case and
    /// surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let unknown = || HeapDbError::UnknownType(s.trim().to_string());

        match normalized.as_str() {
            "INT" => return Ok(DataType::Int),
            "FLOAT" => return Ok(DataType::Float),
            _ => {}
        }

        let (name, rest) = normalized.split_once('(').ok_or_else(unknown)?;
        let len = rest
            .strip_suffix(')')
            .and_then(|n| n.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .ok_or_else(unknown)?;

        match name.trim() {
            "CHAR" => Ok(DataType::Char(len)),
            "VARCHAR" => Ok(DataType::VarChar(len)),
            _ => Err(unknown()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(DataType::Int.width(), 4);
        assert_eq!(DataType::Float.width(), 4);
        assert_eq!(DataType::Char(10).width(), 10);
        assert_eq!(DataType::VarChar(10).width(), 14);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Int.to_string(), "INT");
        assert_eq!(DataType::VarChar(100).to_string(), "VARCHAR(100)");
        assert_eq!(DataType::Char(10).to_string(), "CHAR(10)");
    }

    #[test]
    fn test_parse() {
        assert_eq!("INT".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!(" float ".parse::<DataType>().unwrap(), DataType::Float);
        assert_eq!("char(10)".parse::<DataType>().unwrap(), DataType::Char(10));
        assert_eq!(
            "VARCHAR( 32 )".parse::<DataType>().unwrap(),
            DataType::VarChar(32)
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for bad in ["TEXT", "CHAR", "CHAR()", "CHAR(0)", "VARCHAR(x)", "CHAR(3"] {
            assert!(
                matches!(bad.parse::<DataType>(), Err(HeapDbError::UnknownType(_))),
                "{} should not parse",
                bad
            );
        }
    }

    #[test]
    fn test_display_parse_agree() {
        for dt in [
            DataType::Int,
            DataType::Float,
            DataType::Char(7),
            DataType::VarChar(255),
        ] {
            assert_eq!(dt.to_string().parse::<DataType>().unwrap(), dt);
        }
    }
}
