//! Merging records into one table.

use std::path::Path;
use tracing::{debug, info};

use super::source::RecordSource;
use super::types::{AggregateError, MergedRow, PairKey, TransformRecord};

/// Merged transform table, one row per pair in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    pub rows: Vec<MergedRow>,
}

impl MergedTable {
    /// Output column names.
    pub fn columns() -> Vec<&'static str> {
        let mut columns = vec!["obi1", "obi2"];
        columns.extend(TransformRecord::FIELDS);
        columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, pair: &PairKey) -> Option<&MergedRow> {
        self.rows.iter().find(|r| &r.pair == pair)
    }

    /// Tab-separated rendering with a header line.
    pub fn to_tsv(&self) -> String {
        let mut out = Self::columns().join("\t");
        out.push('\n');
        for row in &self.rows {
            let mut cells = vec![row.pair.left().to_string(), row.pair.right().to_string()];
            cells.extend(row.record.values().iter().map(|v| format!("{:?}", v)));
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }

    pub fn write_tsv(&self, path: &Path) -> Result<(), AggregateError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AggregateError::io(parent, e))?;
        }
        std::fs::write(path, self.to_tsv()).map_err(|e| AggregateError::io(path, e))
    }
}

/// Builds the merged table from every pair `source` knows.
///
/// Pairs are visited in lexicographic stem order, which is the order of
/// their file names. A pair whose record is
/// absent or empty gets the sentinel in every numeric column. A malformed
/// record fails the whole merge.
pub fn merge(source: &dyn RecordSource) -> Result<MergedTable, AggregateError> {
    let mut pairs = source.pairs()?;
    pairs.sort();
    pairs.dedup();

    let mut rows = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let row = match source.load(&pair)? {
            Some(record) => MergedRow {
                pair,
                record,
                present: true,
            },
            None => {
                debug!("No record for {}, using sentinel", pair);
                MergedRow {
                    pair,
                    record: TransformRecord::sentinel(),
                    present: false,
                }
            }
        };
        rows.push(row);
    }

    let missing = rows.iter().filter(|r| !r.present).count();
    info!("Merged {} pairs ({} without a record)", rows.len(), missing);
    Ok(MergedTable { rows })
}
