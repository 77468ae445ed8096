//! Types for the stage module.

use std::path::PathBuf;
use thiserror::Error;

use crate::gate::InspectError;
use crate::store::{StageKind, StoreError};
use crate::tool::ToolError;

/// Errors that end a stage as failed.
#[derive(Debug, Error)]
pub enum StageError {
    /// The external tool failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The completion store could not be read or updated.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A required input is absent or ambiguous.
    #[error("{stage}: {detail}")]
    MissingInput { stage: StageKind, detail: String },

    /// Inputs could not be listed.
    #[error(transparent)]
    Inspection(#[from] InspectError),

    /// An output directory could not be prepared.
    #[error("cannot prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of running one stage for one unit.
#[derive(Debug)]
pub enum StageResult {
    /// The completion marker was present; nothing ran.
    Skipped,
    /// The tool ran and the marker was recorded.
    Completed { log: Option<String> },
    /// The tool or the store failed; no marker was recorded.
    Failed(StageError),
}

impl StageResult {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Completed { .. } => "completed",
            Self::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolOperation;

    #[test]
    fn test_tool_error_message_passes_through() {
        let err: StageError = ToolError::failed(ToolOperation::FluxImage, Some(1), "").into();
        assert_eq!(err.to_string(), "fluximage failed with exit code 1");
    }

    #[test]
    fn test_missing_input_message() {
        let err = StageError::MissingInput {
            stage: StageKind::Image,
            detail: "expected one event file, found 0".to_string(),
        };
        assert_eq!(err.to_string(), "images: expected one event file, found 0");
    }

    #[test]
    fn test_result_labels() {
        assert_eq!(StageResult::Skipped.label(), "skipped");
        assert_eq!(StageResult::Completed { log: None }.label(), "completed");
    }
}
