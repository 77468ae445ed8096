//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Batch runner (unit outcomes, units in flight)
//! - Stage executor (runs, skips, durations)
//! - Tool adapter (invocations, durations)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Runner Metrics
// =============================================================================

/// Units finished, by outcome.
pub static UNITS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavpipe_units_total", "Total units finished by outcome"),
        &["outcome"], // "succeeded", "rejected", "failed", "not_started"
    )
    .unwrap()
});

/// Units currently being processed.
pub static UNITS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("wavpipe_units_in_flight", "Units currently being processed").unwrap()
});

/// Wall-clock time per unit in seconds.
pub static UNIT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "wavpipe_unit_duration_seconds",
            "Duration of one unit's pipeline",
        )
        .buckets(vec![1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 21600.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Stage Metrics
// =============================================================================

/// Stage executions by result.
pub static STAGE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavpipe_stage_runs_total", "Total stage executions"),
        &["stage", "result"], // "completed", "skipped", "failed"
    )
    .unwrap()
});

/// Stage duration in seconds (skips are not observed).
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("wavpipe_stage_duration_seconds", "Duration of stage execution")
            .buckets(vec![1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Tool Metrics
// =============================================================================

/// Tool invocations by program and status.
pub static TOOL_INVOCATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavpipe_tool_invocations_total", "Total tool invocations"),
        &["program", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Tool invocation duration in seconds.
pub static TOOL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "wavpipe_tool_duration_seconds",
            "Duration of a tool invocation",
        )
        .buckets(vec![0.1, 1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 7200.0]),
        &["program"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

/// Returns all core metrics for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runner
        Box::new(UNITS_TOTAL.clone()),
        Box::new(UNITS_IN_FLIGHT.clone()),
        Box::new(UNIT_DURATION.clone()),
        // Stages
        Box::new(STAGE_RUNS.clone()),
        Box::new(STAGE_DURATION.clone()),
        // Tools
        Box::new(TOOL_INVOCATIONS.clone()),
        Box::new(TOOL_DURATION.clone()),
    ]
}
