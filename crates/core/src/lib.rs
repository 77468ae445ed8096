pub mod aggregate;
pub mod config;
pub mod events;
pub mod gate;
pub mod metrics;
pub mod pipeline;
pub mod runner;
pub mod stage;
pub mod store;
pub mod testing;
pub mod tool;
pub mod unit;
pub mod units;

pub use aggregate::{merge, AggregateError, DirRecordSource, MergedTable, RecordSource};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use events::{create_event_system, BatchEvent, EventHandle, EventSink, EventWriter};
pub use gate::{FsInspector, QualityGate, UnitInspector};
pub use pipeline::{UnitError, UnitPipeline};
pub use runner::{BatchReport, RunnerError, RunnerStatus, TaskRunner};
pub use store::{CompletionStore, FsCompletionStore, MemoryCompletionStore};
pub use tool::{ProcessToolAdapter, ToolAdapter, ToolEnvironment};
pub use unit::{RejectionReason, UnitOutcome};
pub use units::{load_unit_list, UnitListError};
