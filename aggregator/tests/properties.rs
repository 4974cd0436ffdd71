//! Property tests for the top-usage lists and start/end pairing.

use accelprof_aggregator::{BufferStats, CounterConfig, PerformanceCounter, TimeStats, TopUsage};
use accelprof_shared::{BufferTrace, CounterEvent};
use proptest::prelude::*;

fn buffer_trace(id: u64, duration: u32) -> BufferTrace {
    BufferTrace {
        address: id,
        context_id: 0,
        command_queue_id: 0,
        size: 64,
        start: 0.0,
        end: duration as f64,
    }
}

fn counter() -> PerformanceCounter {
    PerformanceCounter::new(CounterConfig {
        top_kernel_limit: 10,
        top_transfer_limit: 10,
        per_context_buffer_stats: false,
        max_host_transfer_rate_mbps: 8000.0,
    })
}

/// Reference ranking: stable sort by non-increasing duration, then truncate
fn expected_top(durations: &[u32], capacity: usize) -> Vec<u64> {
    let mut indexed: Vec<(u64, u32)> = durations
        .iter()
        .enumerate()
        .map(|(i, d)| (i as u64, *d))
        .collect();
    indexed.sort_by(|a, b| b.1.cmp(&a.1));
    indexed.truncate(capacity);
    indexed.into_iter().map(|(id, _)| id).collect()
}

proptest! {
    #[test]
    fn prop_top_usage_keeps_true_top_k(
        durations in proptest::collection::vec(0u32..20, 0..60),
        capacity in 1usize..12,
    ) {
        let mut top = TopUsage::new(capacity);
        let mut evicted = 0;
        for (i, duration) in durations.iter().enumerate() {
            if top.push(buffer_trace(i as u64, *duration)).is_some() {
                evicted += 1;
            }
        }

        let kept: Vec<u64> = top.iter().map(|t| t.address).collect();
        prop_assert_eq!(kept, expected_top(&durations, capacity));
        prop_assert_eq!(top.len(), durations.len().min(capacity));
        prop_assert_eq!(evicted, durations.len().saturating_sub(capacity));
    }

    #[test]
    fn prop_matched_pairs_are_counted(
        spans in proptest::collection::vec((0u32..1000, 1u32..100), 0..40),
        stray_ends in 0usize..5,
    ) {
        let mut stats = TimeStats::new();
        for _ in 0..stray_ends {
            prop_assert!(!stats.log_end(1.0));
        }

        let mut expected_total = 0.0;
        for (start, length) in &spans {
            let start = *start as f64;
            let end = start + *length as f64;
            stats.log_start(start);
            prop_assert!(stats.log_end(end));
            prop_assert!(!stats.log_end(end));
            expected_total += end - start;
        }

        prop_assert_eq!(stats.calls(), spans.len() as u64);
        prop_assert!((stats.total_time() - expected_total).abs() < 1e-6);
    }

    #[test]
    fn prop_kernel_span_is_order_independent(
        mut spans in proptest::collection::vec((0u32..1000, 1u32..100), 1..20),
    ) {
        let earliest = spans.iter().map(|(s, _)| *s).min().unwrap() as f64;
        let latest = spans.iter().map(|(s, l)| s + l).max().unwrap() as f64;

        let mut forward = counter();
        let mut backward = counter();
        for (start, length) in &spans {
            forward.log_kernel_execution_start("k", "dev", *start as f64);
            forward.log_kernel_execution_end("k", "dev", (start + length) as f64);
        }
        spans.reverse();
        for (start, length) in &spans {
            backward.log_kernel_execution_start("k", "dev", *start as f64);
            backward.log_kernel_execution_end("k", "dev", (start + length) as f64);
        }

        prop_assert_eq!(forward.total_kernel_execution_time("dev"), latest - earliest);
        prop_assert_eq!(backward.total_kernel_execution_time("dev"), latest - earliest);
        prop_assert_eq!(forward.total_kernel_execution_time("other"), 0.0);
    }

    #[test]
    fn prop_buffer_stats_order_independent(
        mut transfers in proptest::collection::vec((0u64..1_000_000, 0u32..1000), 0..30),
    ) {
        let mut forward = BufferStats::new();
        for (size, duration) in &transfers {
            forward.log(*size, *duration as f64);
        }
        transfers.reverse();
        let mut backward = BufferStats::new();
        for (size, duration) in &transfers {
            backward.log(*size, *duration as f64);
        }

        prop_assert_eq!(forward.count(), backward.count());
        prop_assert_eq!(forward.total_bytes(), backward.total_bytes());
        prop_assert_eq!(forward.total_time(), backward.total_time());
    }

    #[test]
    fn prop_api_summary_sorted(
        spans in proptest::collection::vec((0usize..6, 1u32..50), 0..30),
    ) {
        let mut counter = counter();
        for (name, length) in &spans {
            let name = format!("fn{}", name);
            counter.apply(CounterEvent::FunctionCallStart { name: name.clone(), timestamp: 0.0 });
            counter.apply(CounterEvent::FunctionCallEnd { name, timestamp: *length as f64 });
        }

        let mut writer = accelprof_aggregator::CollectingWriter::new();
        counter.write_api_summary(&mut writer).unwrap();
        let totals: Vec<f64> = writer
            .call_names()
            .iter()
            .map(|name| counter.function_calls()[*name].total_time())
            .collect();
        prop_assert!(totals.windows(2).all(|w| w[0] >= w[1]));
        prop_assert_eq!(totals.len(), counter.function_calls().len());
    }
}
