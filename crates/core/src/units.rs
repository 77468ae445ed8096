//! Unit list loading.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum UnitListError {
    #[error("cannot read unit list {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unit list {0} contains no units")]
    Empty(PathBuf),
}

/// Reads unit ids from a file.
///
/// One id per line, or several separated by commas. Blank lines and `#`
/// comments are ignored. Repeated ids are dropped with a warning, keeping
/// the first occurrence.
pub fn load_unit_list(path: &Path) -> Result<Vec<String>, UnitListError> {
    let text = std::fs::read_to_string(path).map_err(|source| UnitListError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let units = parse_unit_list(&text);
    if units.is_empty() {
        return Err(UnitListError::Empty(path.to_path_buf()));
    }
    Ok(units)
}

pub fn parse_unit_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut units = Vec::new();

    for line in text.lines() {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        };
        for id in line.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if seen.insert(id.to_string()) {
                units.push(id.to_string());
            } else {
                warn!("Unit {} listed more than once, ignoring repeat", id);
            }
        }
    }
    units
}
