//! Types for the completion store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stages that leave a completion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Acquire,
    Reprocess,
    Image,
    Detect,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::Reprocess => "repro",
            Self::Image => "images",
            Self::Detect => "wavdetect",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one completion marker of one unit.
///
/// Detection markers are per edition; every other stage has one marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checkpoint {
    pub stage: StageKind,
    pub edition: Option<String>,
}

impl Checkpoint {
    pub fn stage(stage: StageKind) -> Self {
        Self {
            stage,
            edition: None,
        }
    }

    pub fn detection(edition: impl Into<String>) -> Self {
        Self {
            stage: StageKind::Detect,
            edition: Some(edition.into()),
        }
    }

    /// Label used in log file names: the edition for detection, the stage
    /// name otherwise.
    pub fn label(&self) -> &str {
        match &self.edition {
            Some(edition) => edition,
            None => self.stage.as_str(),
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.edition {
            Some(edition) => write!(f, "{}[{}]", self.stage, edition),
            None => write!(f, "{}", self.stage),
        }
    }
}

/// Errors from a completion store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error on a marker or log path.
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
