//! Types for the unit module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::tool::ToolEnvironment;

/// Instrument family reported by the unit's metadata header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentFamily {
    Acis,
    Hrc,
}

impl InstrumentFamily {
    /// Prefix of the reprocessed event file (`acis*evt2.fits`).
    pub fn event_prefix(&self) -> &'static str {
        match self {
            Self::Acis => "acis",
            Self::Hrc => "hrc",
        }
    }
}

impl fmt::Display for InstrumentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Acis => "ACIS",
            Self::Hrc => "HRC",
        })
    }
}

/// Classification assigned by the quality gate.
///
/// Later stages pick their parameter variant from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitClass {
    pub family: InstrumentFamily,
}

impl UnitClass {
    pub fn new(family: InstrumentFamily) -> Self {
        Self { family }
    }

    /// Energy band used for images and detection.
    pub fn band(&self) -> &'static str {
        match self.family {
            InstrumentFamily::Acis => "broad",
            InstrumentFamily::Hrc => "wide",
        }
    }

    /// Image bin size in sky pixels.
    pub fn binsize(&self) -> u32 {
        match self.family {
            InstrumentFamily::Acis => 1,
            InstrumentFamily::Hrc => 4,
        }
    }
}

/// A unit being processed by one worker.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    /// Observation identifier, unique within a batch.
    pub id: String,
    /// Set once by the quality gate.
    pub class: Option<UnitClass>,
    /// The unit's directory under the archive root.
    pub work_dir: PathBuf,
    /// Private tool namespace for every invocation made for this unit.
    pub env: ToolEnvironment,
}

impl WorkUnit {
    pub fn new(id: impl Into<String>, work_dir: PathBuf, env: ToolEnvironment) -> Self {
        Self {
            id: id.into(),
            class: None,
            work_dir,
            env,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Why the quality gate excluded a unit.
///
/// Variants are listed in the order the gate checks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    MultiComponent,
    MissingAuxFile,
    AmbiguousAuxFile { count: usize },
    UnreadableMetadata,
    WrongObservingMode,
    DispersiveElement,
    ReadoutMode,
    InterleavedClocking,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiComponent => f.write_str("multi-component unit"),
            Self::MissingAuxFile => f.write_str("missing auxiliary file"),
            Self::AmbiguousAuxFile { .. } => f.write_str("ambiguous auxiliary file count"),
            Self::UnreadableMetadata => f.write_str("unreadable metadata"),
            Self::WrongObservingMode => f.write_str("wrong observing mode"),
            Self::DispersiveElement => f.write_str("dispersive element present"),
            Self::ReadoutMode => f.write_str("non-nominal readout mode"),
            Self::InterleavedClocking => f.write_str("interleaved clocking"),
        }
    }
}

/// Terminal outcome of one unit's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum UnitOutcome {
    Succeeded,
    Rejected(RejectionReason),
    Failed(String),
    /// Submitted but never dispatched because the runner shut down.
    NotStarted,
}

impl UnitOutcome {
    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
            Self::NotStarted => "not_started",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Rejected(reason) => write!(f, "rejected: {}", reason),
            Self::Failed(message) => write!(f, "failed: {}", message),
            Self::NotStarted => f.write_str("not started"),
        }
    }
}
