//! Prometheus metrics for the counter itself

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

// ── Ingestion ────────────────────────────────────────────────────────────────

pub static EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accelprof_events_total",
        "Events ingested by the performance counter",
        &["kind"]
    )
    .unwrap()
});

pub static UNMATCHED_ENDS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accelprof_unmatched_ends_total",
        "End events ignored because no start was open",
        &["kind"]
    )
    .unwrap()
});

// ── Top-usage lists ──────────────────────────────────────────────────────────

pub static TOP_USAGE_EVICTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accelprof_top_usage_evictions_total",
        "Traces dropped from a top-usage list due to capacity",
        &["list"]
    )
    .unwrap()
});

// ── Compute units ────────────────────────────────────────────────────────────

pub static CU_STATS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accelprof_cu_stats_total",
        "Device compute-unit statistics reports by reconciliation outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Render all registered metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_touched_counters() {
        CU_STATS_TOTAL.with_label_values(&["dropped"]).inc();
        let text = encode_metrics();
        assert!(text.contains("accelprof_cu_stats_total"));
    }
}
