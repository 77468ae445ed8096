//! Runs stages against a completion store and a tool adapter.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::store::{Checkpoint, CompletionStore};
use crate::tool::ToolAdapter;
use crate::unit::WorkUnit;

use super::traits::Stage;
use super::types::{StageError, StageResult};

/// Executes stages with skip-if-complete semantics.
///
/// A marker is recorded only after the tool succeeded and its log was
/// written. A failed stage has its partial output invalidated so the next
/// run retries it.
#[derive(Clone)]
pub struct StageExecutor {
    store: Arc<dyn CompletionStore>,
    adapter: Arc<dyn ToolAdapter>,
}

impl StageExecutor {
    pub fn new(store: Arc<dyn CompletionStore>, adapter: Arc<dyn ToolAdapter>) -> Self {
        Self { store, adapter }
    }

    pub async fn run(&self, stage: &dyn Stage, unit: &WorkUnit) -> StageResult {
        let result = self.run_unrecorded(stage, unit).await;
        metrics::STAGE_RUNS
            .with_label_values(&[stage.kind().as_str(), result.label()])
            .inc();
        result
    }

    async fn run_unrecorded(&self, stage: &dyn Stage, unit: &WorkUnit) -> StageResult {
        let checkpoint = stage.checkpoint();

        if stage.resumable() {
            match self.store.exists(&unit.id, &checkpoint).await {
                Ok(true) => {
                    debug!("Skipping {} for {}: already complete", checkpoint, unit.id);
                    return StageResult::Skipped;
                }
                Ok(false) => {}
                Err(e) => return StageResult::Failed(e.into()),
            }
        }

        info!("Running {} for {}", checkpoint, unit.id);
        let start = Instant::now();
        let result = self.execute(stage, unit, &checkpoint).await;
        metrics::STAGE_DURATION
            .with_label_values(&[stage.kind().as_str()])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(log) => StageResult::Completed { log },
            Err(e) => {
                warn!("{} failed for {}: {}", checkpoint, unit.id, e);
                if let Err(cleanup) = self.store.invalidate(&unit.id, &checkpoint).await {
                    warn!(
                        "Could not clear partial {} output for {}: {}",
                        checkpoint, unit.id, cleanup
                    );
                }
                StageResult::Failed(e)
            }
        }
    }

    async fn execute(
        &self,
        stage: &dyn Stage,
        unit: &WorkUnit,
        checkpoint: &Checkpoint,
    ) -> Result<Option<String>, StageError> {
        stage.prepare(unit).await?;
        let invocation = stage.invocation(unit).await?;
        let output = self.adapter.invoke(invocation).await?;

        let log = output.log_text().map(str::to_string);
        if let Some(text) = &log {
            self.store.write_log(&unit.id, checkpoint, text).await?;
        }
        self.store.mark(&unit.id, checkpoint).await?;
        Ok(log)
    }
}
