//! Column types and values
//!
//! Supported types:
//! - bool: 1 byte on page
//! - int: 32-bit signed integer, 4 bytes on page
//! - float: 32-bit floating point, 4 bytes on page
//! - string(n): fixed-width UTF-8, n bytes on page

use std::cmp::Ordering;
use std::fmt;

/// Supported column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int,
    /// 32-bit floating point
    Float,
    /// Fixed-width string of the given byte length
    String(usize),
}

impl DataType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String(_) => "string",
        }
    }

    /// Width of one value of this type on a page
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Bool => 1,
            DataType::Int | DataType::Float => 4,
            DataType::String(len) => *len,
        }
    }

    /// Returns true for types that can be summed or averaged
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }
}

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
}

impl Value {
    /// Create a string value
    pub fn string(v: impl Into<String>) -> Self {
        Value::String(v.into())
    }

    /// Returns true if this value can be stored in a column of `data_type`
    pub fn fits(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Bool(_), DataType::Bool) => true,
            (Value::Int(_), DataType::Int) => true,
            (Value::Float(_), DataType::Float) => true,
            (Value::String(s), DataType::String(len)) => s.len() <= *len,
            _ => false,
        }
    }

    /// Numeric view used by statistics and numeric comparison
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Compare two values.
    ///
    /// Same-kind values compare naturally; Int and Float compare numerically.
    /// Every other pairing is incomparable and returns None.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Float(_), _) | (_, Value::Float(_)) => {
                let (a, b) = (self.as_f64()?, other.as_f64()?);
                a.partial_cmp(&b)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
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

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes() {
        assert_eq!(DataType::Bool.size_bytes(), 1);
        assert_eq!(DataType::Int.size_bytes(), 4);
        assert_eq!(DataType::Float.size_bytes(), 4);
        assert_eq!(DataType::String(5).size_bytes(), 5);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(0).to_string(), "0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::string("abc").to_string(), "abc");
    }

    #[test]
    fn test_value_fits() {
        assert!(Value::Int(3).fits(&DataType::Int));
        assert!(!Value::Int(3).fits(&DataType::Float));
        assert!(Value::string("abcde").fits(&DataType::String(5)));
        assert!(!Value::string("abcdef").fits(&DataType::String(5)));
    }

    #[test]
    fn test_numeric_cross_compare() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Float(3.0).compare(&Value::Int(3)), Some(Ordering::Equal));
    }

    #[test]
    fn test_incomparable_values() {
        assert_eq!(Value::Int(1).compare(&Value::Bool(true)), None);
        assert_eq!(Value::string("1").compare(&Value::Int(1)), None);
    }
}
