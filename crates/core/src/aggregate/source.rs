//! Where transform records come from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::types::{AggregateError, PairKey, TransformRecord};

/// Provider of per-pair transform records.
pub trait RecordSource: Send + Sync {
    /// Every pair this source knows about, in any order.
    fn pairs(&self) -> Result<Vec<PairKey>, AggregateError>;

    /// The pair's record, or `None` when it is absent or has no rows.
    fn load(&self, pair: &PairKey) -> Result<Option<TransformRecord>, AggregateError>;
}

/// Reads `<left>_<right>.xmatch` tables from one directory.
///
/// Each file is a whitespace-separated text table: `#` comment lines, one
/// header line of column names, then data rows. The first data row is the
/// record. Extra columns are ignored.
pub struct DirRecordSource {
    dir: PathBuf,
}

impl DirRecordSource {
    pub const EXTENSION: &'static str = "xmatch";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, pair: &PairKey) -> PathBuf {
        self.dir.join(format!("{}.{}", pair, Self::EXTENSION))
    }
}

impl RecordSource for DirRecordSource {
    fn pairs(&self) -> Result<Vec<PairKey>, AggregateError> {
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| AggregateError::io(&self.dir, e))?;

        let mut pairs = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| AggregateError::io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match PairKey::parse(stem) {
                Some(pair) => pairs.push(pair),
                None => warn!("Ignoring {}: name is not <left>_<right>", path.display()),
            }
        }
        Ok(pairs)
    }

    fn load(&self, pair: &PairKey) -> Result<Option<TransformRecord>, AggregateError> {
        let path = self.path_for(pair);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AggregateError::io(path, e)),
        };
        parse_table(&path, &text)
    }
}

/// Parses the first data row of a text table.
pub fn parse_table(path: &Path, text: &str) -> Result<Option<TransformRecord>, AggregateError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let Some((_, header)) = lines.next() else {
        return Ok(None);
    };
    let columns: Vec<&str> = header.split_whitespace().collect();
    let mut index = [0usize; 9];
    for (slot, field) in index.iter_mut().zip(TransformRecord::FIELDS) {
        *slot = columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(field))
            .ok_or_else(|| AggregateError::MissingColumn {
                path: path.to_path_buf(),
                column: field.to_string(),
            })?;
    }

    let Some((line, row)) = lines.next() else {
        return Ok(None);
    };
    let cells: Vec<&str> = row.split_whitespace().collect();
    if cells.len() < columns.len() {
        return Err(AggregateError::Parse {
            path: path.to_path_buf(),
            line,
            reason: format!("expected {} values, found {}", columns.len(), cells.len()),
        });
    }

    let mut values = [0.0; 9];
    for ((value, &i), field) in values.iter_mut().zip(&index).zip(TransformRecord::FIELDS) {
        *value = cells[i].parse().map_err(|_| AggregateError::Parse {
            path: path.to_path_buf(),
            line,
            reason: format!("{} is not a number: {:?}", field, cells[i]),
        })?;
    }
    Ok(Some(TransformRecord::from_values(values)))
}

/// Records held in memory. A pair mapped to `None` exists but is empty.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: BTreeMap<PairKey, Option<TransformRecord>>,
}

impl MemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pair: PairKey, record: Option<TransformRecord>) -> Self {
        self.records.insert(pair, record);
        self
    }
}

impl RecordSource for MemoryRecordSource {
    fn pairs(&self) -> Result<Vec<PairKey>, AggregateError> {
        Ok(self.records.keys().cloned().collect())
    }

    fn load(&self, pair: &PairKey) -> Result<Option<TransformRecord>, AggregateError> {
        Ok(self.records.get(pair).copied().flatten())
    }
}
