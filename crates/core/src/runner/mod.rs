//! Batch task runner.

mod task_runner;
mod types;

pub use task_runner::TaskRunner;
pub use types::{
    BatchReport, OutcomeCounts, ReportEntry, ReportError, RunnerError, RunnerStatus,
};
