//! Mock unit inspector for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gate::{HeaderKeywords, InspectError, UnitInspector};
use crate::unit::{InstrumentFamily, WorkUnit};

use super::fixtures;

/// Mock implementation of the UnitInspector trait.
///
/// Every unit looks like a nominal single-component ACIS observation with
/// one mask file and one event file unless configured otherwise.
#[derive(Debug)]
pub struct MockInspector {
    /// Units reported as multi-component.
    multi_component: Arc<RwLock<HashSet<String>>>,
    /// Units whose structure cannot be inspected.
    broken: Arc<RwLock<HashSet<String>>>,
    /// Mask files per unit.
    aux_files: Arc<RwLock<HashMap<String, Vec<PathBuf>>>>,
    /// Headers keyed by mask file path.
    headers: Arc<RwLock<HashMap<PathBuf, HeaderKeywords>>>,
    /// Mask files whose header cannot be read.
    unreadable: Arc<RwLock<HashSet<PathBuf>>>,
    /// Event files per unit.
    event_files: Arc<RwLock<HashMap<String, Vec<PathBuf>>>>,
}

impl Default for MockInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInspector {
    pub fn new() -> Self {
        Self {
            multi_component: Arc::new(RwLock::new(HashSet::new())),
            broken: Arc::new(RwLock::new(HashSet::new())),
            aux_files: Arc::new(RwLock::new(HashMap::new())),
            headers: Arc::new(RwLock::new(HashMap::new())),
            unreadable: Arc::new(RwLock::new(HashSet::new())),
            event_files: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Path of the mask file reported for `unit` by default.
    pub fn default_mask_path(unit: &str) -> PathBuf {
        PathBuf::from(format!("{}/secondary/{}_msk1.fits", unit, unit))
    }

    pub async fn set_multi_component(&self, unit: &str) {
        self.multi_component.write().await.insert(unit.to_string());
    }

    /// Make structure inspection fail with an I/O error.
    pub async fn set_broken(&self, unit: &str) {
        self.broken.write().await.insert(unit.to_string());
    }

    pub async fn set_aux_files(&self, unit: &str, files: Vec<PathBuf>) {
        self.aux_files
            .write()
            .await
            .insert(unit.to_string(), files);
    }

    /// Set the header read from `unit`'s default mask file.
    pub async fn set_header(&self, unit: &str, header: HeaderKeywords) {
        self.headers
            .write()
            .await
            .insert(Self::default_mask_path(unit), header);
    }

    pub async fn set_unreadable(&self, unit: &str) {
        self.unreadable
            .write()
            .await
            .insert(Self::default_mask_path(unit));
    }

    pub async fn set_event_files(&self, unit: &str, files: Vec<PathBuf>) {
        self.event_files
            .write()
            .await
            .insert(unit.to_string(), files);
    }
}

#[async_trait]
impl UnitInspector for MockInspector {
    async fn is_multi_component(&self, unit: &WorkUnit) -> Result<bool, InspectError> {
        if self.broken.read().await.contains(&unit.id) {
            return Err(InspectError::io(
                unit.work_dir().join("primary"),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "simulated"),
            ));
        }
        Ok(self.multi_component.read().await.contains(&unit.id))
    }

    async fn aux_files(&self, unit: &WorkUnit) -> Result<Vec<PathBuf>, InspectError> {
        Ok(self
            .aux_files
            .read()
            .await
            .get(&unit.id)
            .cloned()
            .unwrap_or_else(|| vec![Self::default_mask_path(&unit.id)]))
    }

    async fn read_header(&self, path: &Path) -> Result<HeaderKeywords, InspectError> {
        if self.unreadable.read().await.contains(path) {
            return Err(InspectError::Header {
                path: path.to_path_buf(),
                reason: "simulated".to_string(),
            });
        }
        Ok(self
            .headers
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_else(|| fixtures::nominal_header(InstrumentFamily::Acis)))
    }

    async fn event_files(
        &self,
        unit: &WorkUnit,
        family: InstrumentFamily,
    ) -> Result<Vec<PathBuf>, InspectError> {
        Ok(self
            .event_files
            .read()
            .await
            .get(&unit.id)
            .cloned()
            .unwrap_or_else(|| {
                vec![unit.work_dir().join("repro").join(format!(
                    "{}f{}_repro_evt2.fits",
                    family.event_prefix(),
                    unit.id
                ))]
            }))
    }
}
