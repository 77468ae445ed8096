//! Pipeline stages.
//!
//! Each stage is one toolkit call with a completion marker. The
//! [`StageExecutor`] owns the skip / run / log / mark sequence so the
//! concrete stages only describe their invocation.

mod executor;
mod stages;
mod traits;
mod types;

pub use executor::StageExecutor;
pub use stages::{AcquireStage, DetectStage, ImageStage, ReprocessStage};
pub use traits::Stage;
pub use types::{StageError, StageResult};
