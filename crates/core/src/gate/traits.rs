//! Trait definitions for unit inspection.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::unit::{InstrumentFamily, WorkUnit};

use super::types::{HeaderKeywords, InspectError};

/// Read-only view of a unit's archive files.
///
/// Used by the quality gate and by stages that need to locate their inputs.
#[async_trait]
pub trait UnitInspector: Send + Sync {
    /// Whether the unit bundles several observation components.
    async fn is_multi_component(&self, unit: &WorkUnit) -> Result<bool, InspectError>;

    /// Candidate auxiliary (mask) files carrying the gate metadata.
    async fn aux_files(&self, unit: &WorkUnit) -> Result<Vec<PathBuf>, InspectError>;

    /// Reads the header keywords of a metadata file.
    async fn read_header(&self, path: &Path) -> Result<HeaderKeywords, InspectError>;

    /// Reprocessed event files for an instrument family.
    async fn event_files(
        &self,
        unit: &WorkUnit,
        family: InstrumentFamily,
    ) -> Result<Vec<PathBuf>, InspectError>;
}
