//! Prometheus text exposition for a finished run.

use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

fn register_metrics(registry: &Registry) {
    for metric in wavpipe_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavpipe_core::metrics::{STAGE_RUNS, UNITS_IN_FLIGHT, UNITS_TOTAL};

    #[test]
    fn test_registry_contains_core_metrics() {
        UNITS_TOTAL.with_label_values(&["succeeded"]).inc();
        UNITS_IN_FLIGHT.set(0);
        STAGE_RUNS.with_label_values(&["images", "completed"]).inc();

        let output = encode_metrics();
        assert!(output.contains("wavpipe_units_total"));
        assert!(output.contains("wavpipe_units_in_flight"));
        assert!(output.contains("wavpipe_stage_runs_total"));
    }
}
