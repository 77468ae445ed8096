//! The four toolkit stages.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DetectionConfig, ImagingConfig};
use crate::gate::UnitInspector;
use crate::store::{Checkpoint, StageKind};
use crate::tool::{ToolInvocation, ToolOperation};
use crate::unit::{UnitClass, WorkUnit};

use super::traits::Stage;
use super::types::StageError;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// The class the quality gate recorded on the unit.
fn class_of(unit: &WorkUnit, stage: StageKind) -> Result<UnitClass, StageError> {
    unit.class.ok_or_else(|| StageError::MissingInput {
        stage,
        detail: format!("{} has not passed the quality gate", unit.id),
    })
}

async fn ensure_dir(path: PathBuf) -> Result<(), StageError> {
    tokio::fs::create_dir_all(&path)
        .await
        .map_err(|source| StageError::Prepare { path, source })
}

/// Downloads the unit's archive files.
pub struct AcquireStage {
    filetypes: Vec<String>,
}

impl AcquireStage {
    pub fn new(filetypes: Vec<String>) -> Self {
        Self { filetypes }
    }
}

#[async_trait]
impl Stage for AcquireStage {
    fn kind(&self) -> StageKind {
        StageKind::Acquire
    }

    async fn invocation(&self, unit: &WorkUnit) -> Result<ToolInvocation, StageError> {
        Ok(
            ToolInvocation::new(&unit.id, ToolOperation::Download, unit.env.clone())
                .arg(&unit.id)
                .arg(self.filetypes.join(",")),
        )
    }
}

/// Reprocesses the raw event list into `U/repro`.
#[derive(Default)]
pub struct ReprocessStage;

#[async_trait]
impl Stage for ReprocessStage {
    fn kind(&self) -> StageKind {
        StageKind::Reprocess
    }

    async fn invocation(&self, unit: &WorkUnit) -> Result<ToolInvocation, StageError> {
        Ok(
            ToolInvocation::new(&unit.id, ToolOperation::Reprocess, unit.env.clone())
                .param("indir", path_arg(unit.work_dir()))
                .param("outdir", "")
                .param("cleanup", "yes")
                .param("clobber", "yes"),
        )
    }
}

/// Builds images, exposure maps and PSF maps into `U/images`.
pub struct ImageStage {
    config: ImagingConfig,
    inspector: Arc<dyn UnitInspector>,
}

impl ImageStage {
    pub fn new(config: ImagingConfig, inspector: Arc<dyn UnitInspector>) -> Self {
        Self { config, inspector }
    }

    /// The single reprocessed event file for this unit's instrument.
    async fn event_file(&self, unit: &WorkUnit, class: UnitClass) -> Result<PathBuf, StageError> {
        let mut files = self.inspector.event_files(unit, class.family).await?;
        if files.len() != 1 {
            return Err(StageError::MissingInput {
                stage: StageKind::Image,
                detail: format!(
                    "expected one {}*evt2.fits in {}, found {}",
                    class.family.event_prefix(),
                    unit.work_dir().join("repro").display(),
                    files.len()
                ),
            });
        }
        Ok(files.remove(0))
    }
}

#[async_trait]
impl Stage for ImageStage {
    fn kind(&self) -> StageKind {
        StageKind::Image
    }

    async fn prepare(&self, unit: &WorkUnit) -> Result<(), StageError> {
        ensure_dir(unit.work_dir().join("images")).await
    }

    async fn invocation(&self, unit: &WorkUnit) -> Result<ToolInvocation, StageError> {
        let class = class_of(unit, StageKind::Image)?;
        let evt = self.event_file(unit, class).await?;
        let outroot = unit.work_dir().join("images").join(&unit.id);

        Ok(
            ToolInvocation::new(&unit.id, ToolOperation::FluxImage, unit.env.clone())
                .param("infile", path_arg(&evt))
                .param("outroot", path_arg(&outroot))
                .param("bands", class.band())
                .param("binsize", class.binsize())
                .param("psfecf", self.config.psfecf)
                .param("background", "none")
                .param("clobber", "yes")
                .param("parallel", "no"),
        )
    }
}

/// Runs wavelet source detection into `U/wavdetect`.
pub struct DetectStage {
    config: DetectionConfig,
}

impl DetectStage {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for DetectStage {
    fn kind(&self) -> StageKind {
        StageKind::Detect
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::detection(&self.config.edition)
    }

    fn resumable(&self) -> bool {
        self.config.skip_existing
    }

    async fn prepare(&self, unit: &WorkUnit) -> Result<(), StageError> {
        ensure_dir(unit.work_dir().join("wavdetect")).await
    }

    async fn invocation(&self, unit: &WorkUnit) -> Result<ToolInvocation, StageError> {
        let class = class_of(unit, StageKind::Detect)?;
        let images = unit.work_dir().join("images");
        let detections = unit.work_dir().join("wavdetect");
        let input = |suffix: &str| {
            path_arg(&images.join(format!("{}_{}_thresh.{}", unit.id, class.band(), suffix)))
        };
        let output = |suffix: &str| {
            path_arg(&detections.join(format!("{}_{}.{}", unit.id, self.config.edition, suffix)))
        };

        Ok(
            ToolInvocation::new(&unit.id, ToolOperation::WavDetect, unit.env.clone())
                .param("infile", input("img"))
                .param("psffile", input("psfmap"))
                .param("expfile", input("expmap"))
                .param("outfile", output("src"))
                .param("scellfile", output("cell"))
                .param("imagefile", output("nbkg"))
                .param("defnbkgfile", output("recon"))
                .param("scales", &self.config.scales)
                .param("clobber", "yes"),
        )
    }
}
