use crate::grammar::ArgKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A stored argument value: a scalar, a flag or a count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// The flat, ordered value map of one node instance.
pub type Values = BTreeMap<ArgKey, ArgValue>;

impl ArgValue {
    pub fn text(value: impl Into<String>) -> Self {
        ArgValue::Text(value.into())
    }

    /// Truthiness used for enabled flags.
    pub fn as_flag(&self) -> bool {
        match self {
            ArgValue::Bool(b) => *b,
            ArgValue::Int(n) => *n != 0,
            ArgValue::Text(s) => matches!(s.as_str(), "true" | "1"),
        }
    }

    /// Interpretation used for repeat and array counts. Negative or unparsable counts are zero.
    pub fn as_count(&self) -> usize {
        match self {
            ArgValue::Bool(b) => usize::from(*b),
            ArgValue::Int(n) => usize::try_from(*n).unwrap_or(0),
            ArgValue::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ArgValue::Text(s) if s.is_empty())
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Int(n) => write!(f, "{}", n),
            ArgValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}
