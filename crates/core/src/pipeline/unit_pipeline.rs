//! Per-unit pipeline composition.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Config, DetectionConfig, ImagingConfig};
use crate::gate::{GateVerdict, QualityGate, UnitInspector};
use crate::stage::{
    AcquireStage, DetectStage, ImageStage, ReprocessStage, Stage, StageExecutor, StageResult,
};
use crate::store::CompletionStore;
use crate::tool::{ToolAdapter, ToolEnvironment};
use crate::unit::{UnitOutcome, WorkUnit};

use super::error::UnitError;

/// Runs the fixed stage sequence for one unit.
///
/// environment setup → acquire → quality gate → reprocess → image → detect
///
/// The first failed stage or a gate rejection ends the unit; later stages
/// are not attempted.
pub struct UnitPipeline {
    archive_root: PathBuf,
    install_dir: PathBuf,
    filetypes: Vec<String>,
    imaging: ImagingConfig,
    detection: DetectionConfig,
    executor: StageExecutor,
    gate: QualityGate,
    inspector: Arc<dyn UnitInspector>,
}

impl UnitPipeline {
    pub fn new(
        config: &Config,
        store: Arc<dyn CompletionStore>,
        adapter: Arc<dyn ToolAdapter>,
        inspector: Arc<dyn UnitInspector>,
    ) -> Self {
        Self {
            archive_root: config.runner.archive_root.clone(),
            install_dir: config.tool.install_dir.clone(),
            filetypes: config.tool.download_filetypes.clone(),
            imaging: config.imaging.clone(),
            detection: config.detection.clone(),
            executor: StageExecutor::new(store, adapter),
            gate: QualityGate::new(inspector.clone()),
            inspector,
        }
    }

    /// Runs every stage for `unit_id` and returns its terminal outcome.
    ///
    /// Never returns an error: failures become `UnitOutcome::Failed`.
    pub async fn execute(&self, unit_id: &str) -> UnitOutcome {
        let outcome = match self.run(unit_id).await {
            Ok(outcome) => outcome,
            Err(e) => UnitOutcome::Failed(e.to_string()),
        };
        debug!("Unit {} ended: {}", unit_id, outcome);
        outcome
    }

    async fn run(&self, unit_id: &str) -> Result<UnitOutcome, UnitError> {
        let mut unit = self.setup(unit_id).await?;

        let acquire = AcquireStage::new(self.filetypes.clone());
        self.run_stage(&acquire, &unit).await?;

        unit.class = match self.gate.classify(&unit).await {
            Ok(class) => Some(class),
            Err(GateVerdict::Rejected(reason)) => return Ok(UnitOutcome::Rejected(reason)),
            Err(GateVerdict::Failed(e)) => return Err(UnitError::Inspection(e)),
        };

        self.run_stage(&ReprocessStage, &unit).await?;

        let image = ImageStage::new(self.imaging.clone(), self.inspector.clone());
        self.run_stage(&image, &unit).await?;

        let detect = DetectStage::new(self.detection.clone());
        self.run_stage(&detect, &unit).await?;

        info!("Unit {} complete", unit.id);
        Ok(UnitOutcome::Succeeded)
    }

    /// Creates the unit's scratch directory and tool namespace.
    ///
    /// Safe to repeat: an existing scratch directory is reused.
    async fn setup(&self, unit_id: &str) -> Result<WorkUnit, UnitError> {
        if !is_valid_unit_id(unit_id) {
            return Err(UnitError::InvalidId(unit_id.to_string()));
        }

        let work_dir = self.archive_root.join(unit_id);
        let scratch = work_dir.join("tmp");
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|source| UnitError::Environment {
                path: scratch.clone(),
                source,
            })?;

        let env = ToolEnvironment::for_unit(&self.install_dir, scratch);
        Ok(WorkUnit::new(unit_id, work_dir, env))
    }

    async fn run_stage(&self, stage: &dyn Stage, unit: &WorkUnit) -> Result<(), UnitError> {
        match self.executor.run(stage, unit).await {
            StageResult::Skipped | StageResult::Completed { .. } => Ok(()),
            StageResult::Failed(e) => Err(UnitError::from_stage(stage.kind(), &unit.id, e)),
        }
    }
}

/// A unit id must be a single, ordinary path component.
fn is_valid_unit_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.chars().any(char::is_whitespace)
}
