//! Archive-backed unit inspector.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::unit::{InstrumentFamily, WorkUnit};

use super::fits;
use super::traits::UnitInspector;
use super::types::{HeaderKeywords, InspectError};

static RAW_EVENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"evt1").unwrap());
static MASK_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"msk1\.fits").unwrap());
static ACIS_EVENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^acis.*evt2\.fits$").unwrap());
static HRC_EVENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^hrc.*evt2\.fits$").unwrap());

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Inspects the archive layout under a unit's directory.
///
/// - `U/primary/*evt1*`: raw event lists; more than one means the unit has
///   several components
/// - `U/secondary/*msk1.fits*`: mask file holding the gate keywords
/// - `U/repro/<family>*evt2.fits`: reprocessed event list
#[derive(Debug, Clone, Default)]
pub struct FsInspector;

impl FsInspector {
    pub fn new() -> Self {
        Self
    }
}

/// Sorted names in `dir` matching `pattern`, as full paths.
///
/// A missing directory has no matches.
async fn matching_files(dir: &Path, pattern: &Regex) -> Result<Vec<PathBuf>, InspectError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(InspectError::io(dir, e)),
    };

    let mut matches = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| InspectError::io(dir, e))?
    {
        let name = entry.file_name();
        if pattern.is_match(&name.to_string_lossy()) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

fn decompress(path: &Path, bytes: Vec<u8>) -> Result<Vec<u8>, InspectError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    let mut out = Vec::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_end(&mut out)
        .map_err(|e| InspectError::Header {
            path: path.to_path_buf(),
            reason: format!("gzip: {}", e),
        })?;
    Ok(out)
}

#[async_trait]
impl UnitInspector for FsInspector {
    async fn is_multi_component(&self, unit: &WorkUnit) -> Result<bool, InspectError> {
        let primary = unit.work_dir().join("primary");
        if !fs::try_exists(&primary)
            .await
            .map_err(|e| InspectError::io(&primary, e))?
        {
            return Err(InspectError::io(
                &primary,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no primary directory"),
            ));
        }
        Ok(matching_files(&primary, &RAW_EVENTS).await?.len() > 1)
    }

    async fn aux_files(&self, unit: &WorkUnit) -> Result<Vec<PathBuf>, InspectError> {
        matching_files(&unit.work_dir().join("secondary"), &MASK_FILE).await
    }

    async fn read_header(&self, path: &Path) -> Result<HeaderKeywords, InspectError> {
        let bytes = fs::read(path)
            .await
            .map_err(|e| InspectError::io(path, e))?;
        let bytes = decompress(path, bytes)?;
        fits::read_keywords(&bytes).map_err(|e| InspectError::Header {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn event_files(
        &self,
        unit: &WorkUnit,
        family: InstrumentFamily,
    ) -> Result<Vec<PathBuf>, InspectError> {
        let pattern = match family {
            InstrumentFamily::Acis => &*ACIS_EVENTS,
            InstrumentFamily::Hrc => &*HRC_EVENTS,
        };
        matching_files(&unit.work_dir().join("repro"), pattern).await
    }
}
