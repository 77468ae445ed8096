//! Trait definitions for pipeline stages.

use async_trait::async_trait;

use crate::store::{Checkpoint, StageKind};
use crate::tool::ToolInvocation;
use crate::unit::WorkUnit;

use super::types::StageError;

/// One checkpointed step of the unit pipeline.
///
/// A stage only describes its tool call; skipping, logging and marking are
/// done by [`StageExecutor`](super::StageExecutor).
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Marker that proves this stage complete.
    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::stage(self.kind())
    }

    /// Whether an existing marker lets the stage be skipped.
    fn resumable(&self) -> bool {
        true
    }

    /// Creates output directories the tool expects to exist.
    async fn prepare(&self, _unit: &WorkUnit) -> Result<(), StageError> {
        Ok(())
    }

    /// Builds the tool invocation for `unit`.
    async fn invocation(&self, unit: &WorkUnit) -> Result<ToolInvocation, StageError>;
}
