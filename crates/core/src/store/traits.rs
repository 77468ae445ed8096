//! Trait definitions for the completion store.

use async_trait::async_trait;

use super::types::{Checkpoint, StoreError};

/// Records which stages of which units are complete.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Whether the marker for `checkpoint` exists for `unit`.
    async fn exists(&self, unit: &str, checkpoint: &Checkpoint) -> Result<bool, StoreError>;

    /// Records the marker after a successful stage.
    async fn mark(&self, unit: &str, checkpoint: &Checkpoint) -> Result<(), StoreError>;

    /// Persists a stage log beside the stage output.
    async fn write_log(
        &self,
        unit: &str,
        checkpoint: &Checkpoint,
        log: &str,
    ) -> Result<(), StoreError>;

    /// Drops whatever marker a failed stage may have left behind, so the
    /// next run retries the stage.
    async fn invalidate(&self, unit: &str, checkpoint: &Checkpoint) -> Result<(), StoreError>;
}
