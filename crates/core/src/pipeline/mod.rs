//! Unit pipeline: the fixed stage sequence for one unit.

mod error;
mod unit_pipeline;

pub use error::UnitError;
pub use unit_pipeline::UnitPipeline;
