//! Batch progress events.
//!
//! The runner emits events through an [`EventHandle`]; an [`EventWriter`]
//! task fans them out to the configured sinks (console, JSON-lines
//! journal). Events for one unit arrive in emission order, so a unit's
//! start always precedes its finish.

mod handle;
mod sink;
mod types;
mod writer;

pub use handle::*;
pub use sink::*;
pub use types::*;
pub use writer::*;
