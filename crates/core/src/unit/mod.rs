//! Work units and their terminal outcomes.
//!
//! A [`WorkUnit`] is one observation moving through the pipeline. It is
//! created when the runner dispatches an identifier, carries the unit's
//! private tool namespace, and picks up its [`UnitClass`] from the quality
//! gate. The pipeline always ends a unit with exactly one [`UnitOutcome`].

mod types;

pub use types::{InstrumentFamily, RejectionReason, UnitClass, UnitOutcome, WorkUnit};
