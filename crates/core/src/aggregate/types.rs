//! Types for the aggregate module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Value written in every numeric column of a pair without a record.
pub const SENTINEL: f64 = -999.0;

/// Pair of unit ids a transform record relates, named by its record stem.
///
/// Identity and ordering are those of the stem string, so keys sort the way
/// their file names do (`9420_100` before `942_1843`). `left` and `right`
/// are the first two `_`-separated fields of the stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    stem: String,
    left: String,
    right: String,
}

impl PairKey {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        let (left, right) = (left.into(), right.into());
        Self {
            stem: format!("{}_{}", left, right),
            left,
            right,
        }
    }

    /// Parses a `<left>_<right>[_...]` stem. Fields past the second are
    /// kept in the stem but belong to neither id.
    pub fn parse(stem: &str) -> Option<Self> {
        let mut fields = stem.split('_');
        let left = fields.next().filter(|s| !s.is_empty())?;
        let right = fields.next().filter(|s| !s.is_empty())?;
        Some(Self {
            stem: stem.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        })
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &str {
        &self.right
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem)
    }
}

/// Geometric transform between two units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    pub t1: f64,
    pub t2: f64,
    pub ra_ref: f64,
    pub dec_ref: f64,
    pub roll_ref: f64,
    pub xpix_ref: f64,
    pub ypix_ref: f64,
    pub x_scale: f64,
    pub y_scale: f64,
}

impl TransformRecord {
    /// Column names, in output order.
    pub const FIELDS: [&'static str; 9] = [
        "t1", "t2", "ra_ref", "dec_ref", "roll_ref", "xpix_ref", "ypix_ref", "x_scale", "y_scale",
    ];

    pub fn sentinel() -> Self {
        Self::from_values([SENTINEL; 9])
    }

    pub fn from_values(v: [f64; 9]) -> Self {
        Self {
            t1: v[0],
            t2: v[1],
            ra_ref: v[2],
            dec_ref: v[3],
            roll_ref: v[4],
            xpix_ref: v[5],
            ypix_ref: v[6],
            x_scale: v[7],
            y_scale: v[8],
        }
    }

    pub fn values(&self) -> [f64; 9] {
        [
            self.t1,
            self.t2,
            self.ra_ref,
            self.dec_ref,
            self.roll_ref,
            self.xpix_ref,
            self.ypix_ref,
            self.x_scale,
            self.y_scale,
        ]
    }
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub pair: PairKey,
    pub record: TransformRecord,
    /// False when the record was absent or empty and the sentinel was used.
    pub present: bool,
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: missing column {column}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}:{line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl AggregateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_parse() {
        assert_eq!(PairKey::parse("1843_1844"), Some(PairKey::new("1843", "1844")));
        assert_eq!(PairKey::parse("1843"), None);
        assert_eq!(PairKey::parse("_1844"), None);
        assert_eq!(PairKey::parse("1843_"), None);
    }

    #[test]
    fn test_pair_key_extra_fields_stay_in_stem() {
        let key = PairKey::parse("a_b_c").unwrap();
        assert_eq!(key.left(), "a");
        assert_eq!(key.right(), "b");
        assert_eq!(key.stem(), "a_b_c");
        assert_ne!(key, PairKey::new("a", "b"));
    }

    #[test]
    fn test_pair_key_orders_by_stem() {
        let mut keys = vec![
            PairKey::new("C", "D"),
            PairKey::new("942", "1843"),
            PairKey::new("A", "B"),
            PairKey::new("9420", "100"),
        ];
        keys.sort();
        let stems: Vec<&str> = keys.iter().map(PairKey::stem).collect();
        assert_eq!(stems, vec!["9420_100", "942_1843", "A_B", "C_D"]);
    }

    #[test]
    fn test_sentinel_fills_every_field() {
        assert!(TransformRecord::sentinel()
            .values()
            .iter()
            .all(|v| *v == SENTINEL));
    }
}
