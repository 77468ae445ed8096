//! Quality gate: classify a unit or reject it with a named reason.
//!
//! The gate reads the unit's mask-file header once, right after acquisition,
//! and applies its checks in a fixed order:
//!
//! 1. multi-component unit
//! 2. missing or ambiguous mask file
//! 3. unreadable header
//! 4. observing mode other than `POINTING`
//! 5. a grating in the beam
//! 6. for ACIS only: readout mode other than `TIMED`, then interleaved
//!    clocking (`DTYCYCLE != 0`)
//!
//! A passing unit is classified ACIS or HRC. Archive access goes through
//! the [`UnitInspector`] trait; [`FsInspector`] reads the archive layout and
//! parses FITS headers (plain or gzip-compressed).

mod classify;
mod fits;
mod fs;
mod traits;
mod types;

pub use classify::{check_header, QualityGate};
pub use fits::FitsError;
pub use fs::FsInspector;
pub use traits::UnitInspector;
pub use types::{GateVerdict, HeaderKeywords, HeaderValue, InspectError};
