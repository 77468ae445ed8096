//! Types for the runner module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::unit::UnitOutcome;

/// Errors that prevent a batch from starting.
///
/// Once a batch has started, nothing a unit does produces one of these.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("unit {0} submitted more than once")]
    DuplicateUnit(String),

    #[error("a batch is already running")]
    AlreadyRunning,
}

/// Live view of the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerStatus {
    pub running: bool,
    /// Units whose pipeline is executing right now.
    pub active: usize,
    /// Units waiting for a free worker.
    pub queued: usize,
    /// Units with a recorded outcome.
    pub completed: usize,
}

/// One unit's line in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub unit: String,
    pub outcome: UnitOutcome,
    pub elapsed_secs: f64,
}

/// Number of units per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub succeeded: usize,
    pub rejected: usize,
    pub failed: usize,
    pub not_started: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.succeeded + self.rejected + self.failed + self.not_started
    }
}

/// Per-unit outcomes of one batch, one entry per submitted unit, in
/// submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub concurrency: usize,
    pub counts: OutcomeCounts,
    pub entries: Vec<ReportEntry>,
}

impl BatchReport {
    pub fn new(
        batch_id: Uuid,
        started_at: DateTime<Utc>,
        concurrency: usize,
        entries: Vec<ReportEntry>,
    ) -> Self {
        let mut counts = OutcomeCounts::default();
        for entry in &entries {
            match entry.outcome {
                UnitOutcome::Succeeded => counts.succeeded += 1,
                UnitOutcome::Rejected(_) => counts.rejected += 1,
                UnitOutcome::Failed(_) => counts.failed += 1,
                UnitOutcome::NotStarted => counts.not_started += 1,
            }
        }
        Self {
            batch_id,
            started_at,
            finished_at: Utc::now(),
            concurrency,
            counts,
            entries,
        }
    }

    pub fn get(&self, unit: &str) -> Option<&UnitOutcome> {
        self.entries
            .iter()
            .find(|e| e.unit == unit)
            .map(|e| &e.outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::RejectionReason;

    fn entry(unit: &str, outcome: UnitOutcome) -> ReportEntry {
        ReportEntry {
            unit: unit.to_string(),
            outcome,
            elapsed_secs: 0.5,
        }
    }

    fn report() -> BatchReport {
        BatchReport::new(
            Uuid::new_v4(),
            Utc::now(),
            2,
            vec![
                entry("1", UnitOutcome::Succeeded),
                entry("2", UnitOutcome::Rejected(RejectionReason::ReadoutMode)),
                entry("3", UnitOutcome::Failed("boom".to_string())),
                entry("4", UnitOutcome::NotStarted),
                entry("5", UnitOutcome::Succeeded),
            ],
        )
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert_eq!(
            report.counts,
            OutcomeCounts {
                succeeded: 2,
                rejected: 1,
                failed: 1,
                not_started: 1,
            }
        );
        assert_eq!(report.counts.total(), report.len());
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_get() {
        let report = report();
        assert_eq!(report.get("3"), Some(&UnitOutcome::Failed("boom".to_string())));
        assert_eq!(report.get("missing"), None);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/batch.json");
        let report = report();
        report.write_json(&path).unwrap();

        let parsed: BatchReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.batch_id, report.batch_id);
        assert_eq!(parsed.entries, report.entries);
        assert_eq!(parsed.counts, report.counts);
    }
}
