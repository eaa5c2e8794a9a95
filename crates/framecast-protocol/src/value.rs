//! Primitive protocol value.

use framecast_core::{Error, Result};
use std::fmt;

/// A tagged protocol value: integer, floating point, or string.
///
/// Values appear on the right-hand side of assignments, in success and
/// error bodies, and in binary data attributes. The wire form is
/// produced by the [`Display`] implementation: integers as plain
/// decimal, doubles in decimal notation that always carries a `.` or
/// exponent (so they re-parse as doubles), strings wrapped in braces.
///
/// # Example
/// ```
/// use framecast_protocol::Value;
///
/// assert_eq!(Value::Int(42).to_string(), "42");
/// assert_eq!(Value::Double(4.0).to_string(), "4.0");
/// assert_eq!(Value::Str("mono".into()).to_string(), "{mono}");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Str(String),
}

impl Value {
    /// Returns `true` if the value holds an integer.
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// Returns `true` if the value holds a double.
    pub fn is_double(&self) -> bool {
        matches!(self, Value::Double(_))
    }

    /// Returns `true` if the value holds a string.
    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Returns `true` if the value is numeric (int or double).
    pub fn is_numeric(&self) -> bool {
        !self.is_str()
    }

    /// Get the integer content, without coercion.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Coerce a numeric value to an integer, truncating doubles.
    ///
    /// # Errors
    /// Returns `Error::InvalidValue` for string values.
    pub fn to_int(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            Value::Double(v) => Ok(*v as i64),
            Value::Str(s) => Err(Error::InvalidValue(format!(
                "expected numeric value, got string '{s}'"
            ))),
        }
    }

    /// Coerce a numeric value to a double.
    ///
    /// # Errors
    /// Returns `Error::InvalidValue` for string values.
    pub fn to_double(&self) -> Result<f64> {
        match self {
            Value::Int(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            Value::Str(s) => Err(Error::InvalidValue(format!(
                "expected numeric value, got string '{s}'"
            ))),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            // {:?} keeps a trailing ".0" on whole doubles, so the wire
            // form re-parses as a double rather than collapsing to int.
            Value::Double(v) => write!(f, "{v:?}"),
            Value::Str(v) => write!(f, "{{{v}}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Int(0), "0")]
    #[case(Value::Int(-17), "-17")]
    #[case(Value::Double(4.0), "4.0")]
    #[case(Value::Double(3.14), "3.14")]
    #[case(Value::Double(-0.5), "-0.5")]
    #[case(Value::Str("".into()), "{}")]
    #[case(Value::Str("hello world".into()), "{hello world}")]
    fn test_wire_form(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Int(5).to_double().unwrap(), 5.0);
        assert_eq!(Value::Double(5.9).to_int().unwrap(), 5);
        assert!(Value::Str("5".into()).to_int().is_err());
        assert!(Value::Str("5".into()).to_double().is_err());
    }

    #[test]
    fn test_exact_int_access() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Double(7.0).as_int(), None);
    }
}
