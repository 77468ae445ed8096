//! Result aggregation.
//!
//! Collects one transform record per unit pair into a single table,
//! substituting [`SENTINEL`] where a pair has no record.

mod merge;
mod source;
mod types;

pub use merge::{merge, MergedTable};
pub use source::{parse_table, DirRecordSource, MemoryRecordSource, RecordSource};
pub use types::{AggregateError, MergedRow, PairKey, TransformRecord, SENTINEL};
