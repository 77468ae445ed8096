//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external collaborator
//! traits, so the pipeline and runner can be exercised without the
//! analysis toolkit or a real archive.
//!
//! # Example
//!
//! ```rust,ignore
//! use wavpipe_core::testing::{MockInspector, MockToolAdapter};
//!
//! let adapter = MockToolAdapter::new();
//! let inspector = MockInspector::new();
//!
//! // Configure behavior
//! adapter.fail_for("1843", ToolOperation::FluxImage).await;
//! inspector.set_header("2000", fixtures::header_with("OBS_MODE", "SLEW")).await;
//! ```

mod mock_inspector;
mod mock_tool;

pub use mock_inspector::MockInspector;
pub use mock_tool::{MockToolAdapter, RecordedInvocation};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::gate::{HeaderKeywords, HeaderValue};
    use crate::unit::InstrumentFamily;

    /// Header of an observation that passes every gate check.
    pub fn nominal_header(family: InstrumentFamily) -> HeaderKeywords {
        let instrument = match family {
            InstrumentFamily::Acis => "ACIS",
            InstrumentFamily::Hrc => "HRC",
        };
        let header = HeaderKeywords::new()
            .with("OBS_MODE", HeaderValue::Str("POINTING".to_string()))
            .with("GRATING", HeaderValue::Str("NONE".to_string()))
            .with("INSTRUME", HeaderValue::Str(instrument.to_string()));

        match family {
            InstrumentFamily::Acis => header
                .with("READMODE", HeaderValue::Str("TIMED".to_string()))
                .with("DTYCYCLE", HeaderValue::Int(0)),
            InstrumentFamily::Hrc => header,
        }
    }

    /// Nominal ACIS header with one string keyword replaced.
    pub fn header_with(key: &str, value: &str) -> HeaderKeywords {
        nominal_header(InstrumentFamily::Acis).with(key, HeaderValue::Str(value.to_string()))
    }
}
