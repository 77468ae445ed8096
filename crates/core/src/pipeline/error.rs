//! Error types for the unit pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::gate::InspectError;
use crate::stage::StageError;
use crate::store::StageKind;
use crate::tool::ToolError;

/// Why a unit's pipeline failed.
///
/// Every variant ends the unit as `UnitOutcome::Failed` with the variant's
/// message; none of them stops the batch.
#[derive(Debug, Error)]
pub enum UnitError {
    /// The identifier cannot name a directory under the archive root.
    #[error("invalid unit id {0:?}")]
    InvalidId(String),

    /// Scratch directory or tool namespace could not be set up.
    #[error("cannot set up {path}: {source}")]
    Environment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive refused or could not be reached.
    #[error("can't download {unit}: {source}")]
    Acquisition {
        unit: String,
        #[source]
        source: ToolError,
    },

    /// A toolkit program reported failure.
    #[error("{stage}: {source}")]
    ToolInvocation {
        stage: StageKind,
        #[source]
        source: ToolError,
    },

    /// A stage failed for a reason other than its tool.
    #[error("{stage}: {source}")]
    Stage {
        stage: StageKind,
        #[source]
        source: StageError,
    },

    /// The unit's archive files could not be inspected.
    #[error("inspection failed: {0}")]
    Inspection(#[from] InspectError),
}

impl UnitError {
    /// Classifies a stage failure.
    pub fn from_stage(stage: StageKind, unit: &str, error: StageError) -> Self {
        match (stage, error) {
            (StageKind::Acquire, StageError::Tool(source)) => Self::Acquisition {
                unit: unit.to_string(),
                source,
            },
            (stage, StageError::Tool(source)) => Self::ToolInvocation { stage, source },
            (stage, source) => Self::Stage { stage, source },
        }
    }
}
