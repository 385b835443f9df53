use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::format::parse_number;

/// Named magnitudes fed to `Format::render`, e.g. `{"hrs": 2, "mins": 5}`.
pub type Record = BTreeMap<String, f64>;

/// A value recovered by `Format::captures`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Captured {
    Number(f64),
    /// A capture that does not read as a number.
    Text(String),
}

/// What `Format::captures` returns: reference name to captured value.
/// Empty when the input did not match.
pub type Captures = BTreeMap<String, Captured>;

impl Captured {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Captured::Number(n) => Some(*n),
            Captured::Text(_) => None,
        }
    }
}

/// An intermediate result while evaluating a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A reference with no binding in the record.
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Missing => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
        }
    }

    /// Numeric reading used by the relational operators.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Missing => None,
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_number(s.trim()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Text printed for a number. Never uses exponent notation, so the output
/// always reads back through the capture grammar.
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}
