//! Types for the quality gate.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::unit::RejectionReason;

/// A single header keyword value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "'{}'", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(b) => f.write_str(if *b { "T" } else { "F" }),
        }
    }
}

/// Header keywords of a unit's metadata file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderKeywords {
    values: HashMap<String, HeaderValue>,
}

impl HeaderKeywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: HeaderValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value, replacing any earlier one for the same keyword.
    pub fn insert(&mut self, key: &str, value: HeaderValue) {
        self.values.insert(key.to_ascii_uppercase(), value);
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.values.get(&key.to_ascii_uppercase())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(HeaderValue::as_i64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies every keyword of `other` over this one.
    pub fn merge(&mut self, other: HeaderKeywords) {
        self.values.extend(other.values);
    }
}

/// Errors from a unit inspector.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable header in {path}: {reason}")]
    Header { path: PathBuf, reason: String },
}

impl InspectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why the gate did not classify a unit.
#[derive(Debug, Error)]
pub enum GateVerdict {
    /// Excluded by policy.
    #[error("rejected: {0}")]
    Rejected(RejectionReason),

    /// The unit could not be inspected at all.
    #[error("inspection failed: {0}")]
    Failed(#[from] InspectError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        let header = HeaderKeywords::new().with("obs_mode", HeaderValue::Str("POINTING".into()));
        assert_eq!(header.get_str("OBS_MODE"), Some("POINTING"));
    }

    #[test]
    fn test_numeric_accessors() {
        let header = HeaderKeywords::new()
            .with("DTYCYCLE", HeaderValue::Int(0))
            .with("EXPOSURE", HeaderValue::Float(1234.5));
        assert_eq!(header.get_f64("DTYCYCLE"), Some(0.0));
        assert_eq!(header.get_i64("DTYCYCLE"), Some(0));
        assert_eq!(header.get_i64("EXPOSURE"), None);
        assert_eq!(header.get_str("DTYCYCLE"), None);
    }

    #[test]
    fn test_merge_overrides() {
        let mut primary = HeaderKeywords::new()
            .with("INSTRUME", HeaderValue::Str("ACIS".into()))
            .with("OBJECT", HeaderValue::Str("M31".into()));
        let ext = HeaderKeywords::new().with("INSTRUME", HeaderValue::Str("HRC".into()));
        primary.merge(ext);
        assert_eq!(primary.get_str("INSTRUME"), Some("HRC"));
        assert_eq!(primary.get_str("OBJECT"), Some("M31"));
        assert_eq!(primary.len(), 2);
    }
}
