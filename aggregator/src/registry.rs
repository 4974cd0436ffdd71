//! Compute-unit execution registry
//!
//! Execution statistics keyed by [`ComputeUnitKey`]. The runtime often reports
//! an execution before it knows which compute unit ran it, and the device
//! reports per-CU counters by CU name only. [`ComputeUnitRegistry::record_stats`]
//! reconciles the two: a provisional key (no CU name) for the same kernel is
//! promoted to a confirmed key carrying the device's statistics.

use std::collections::BTreeMap;

use accelprof_shared::types::events::{DurationMs, Timestamp};
use accelprof_shared::types::key::ComputeUnitKey;

use crate::stats::TimeStats;

/// Outcome of applying device-reported CU statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// A key with this CU name already existed and was overwritten
    Updated(ComputeUnitKey),
    /// A provisional key was promoted to this confirmed key
    Reconciled(ComputeUnitKey),
    /// A provisional candidate exists but the report carried no time
    Skipped,
    /// No key for this CU or kernel yet; the report was dropped
    Dropped,
}

impl Reconciliation {
    pub fn label(&self) -> &'static str {
        match self {
            Reconciliation::Updated(_) => "updated",
            Reconciliation::Reconciled(_) => "reconciled",
            Reconciliation::Skipped => "skipped",
            Reconciliation::Dropped => "dropped",
        }
    }
}

/// Map from compute-unit identity to its execution statistics.
///
/// Iteration follows key order, so summaries are deterministic.
#[derive(Debug, Clone, Default)]
pub struct ComputeUnitRegistry {
    stats: BTreeMap<ComputeUnitKey, TimeStats>,
}

impl ComputeUnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_start(&mut self, key: &ComputeUnitKey, timestamp: Timestamp) {
        self.entry(key).log_start(timestamp);
    }

    /// Returns false when no execution was open for `key`. An end for an
    /// unknown key leaves the registry untouched.
    pub fn log_end(&mut self, key: &ComputeUnitKey, timestamp: Timestamp) -> bool {
        match self.stats.get_mut(key) {
            Some(stats) => stats.log_end(timestamp),
            None => false,
        }
    }

    /// Apply statistics the device aggregated for compute unit `cu_name`.
    ///
    /// 1. A key already carrying `cu_name` is overwritten in place.
    /// 2. Otherwise the first provisional key running `kernel_name` is
    ///    replaced by the same key with `cu_name` filled in, provided the
    ///    report carries a positive total time.
    /// 3. Otherwise the report is dropped; it will be picked up once the
    ///    runtime has registered an execution for this kernel.
    ///
    /// A report with a blank CU name cannot be attributed and is dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn record_stats(
        &mut self,
        cu_name: &str,
        kernel_name: &str,
        total_time: DurationMs,
        max_time: DurationMs,
        min_time: DurationMs,
        calls: u32,
        clock_freq_mhz: u32,
    ) -> Reconciliation {
        if cu_name.is_empty() {
            return Reconciliation::Dropped;
        }

        if let Some((key, stats)) = self
            .stats
            .iter_mut()
            .find(|(key, _)| key.cu_name() == Some(cu_name))
        {
            stats.log_stats(total_time, max_time, min_time, calls, clock_freq_mhz);
            return Reconciliation::Updated(key.clone());
        }

        let Some(provisional) = self
            .stats
            .keys()
            .find(|key| key.is_provisional() && key.kernel_name == kernel_name)
            .cloned()
        else {
            return Reconciliation::Dropped;
        };

        if total_time <= 0.0 {
            return Reconciliation::Skipped;
        }

        // the device counters supersede whatever the provisional key timed
        self.stats.remove(&provisional);
        let confirmed = provisional.with_cu(cu_name);
        self.entry(&confirmed)
            .log_stats(total_time, max_time, min_time, calls, clock_freq_mhz);
        Reconciliation::Reconciled(confirmed)
    }

    pub fn get(&self, key: &ComputeUnitKey) -> Option<&TimeStats> {
        self.stats.get(key)
    }

    /// First record on `device_name` run by compute unit `cu_name`
    pub fn find_by_device_cu(&self, device_name: &str, cu_name: &str) -> Option<&TimeStats> {
        self.stats
            .iter()
            .find(|(key, _)| key.device_name == device_name && key.cu_name() == Some(cu_name))
            .map(|(_, stats)| stats)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComputeUnitKey, &TimeStats)> {
        self.stats.iter()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    fn entry(&mut self, key: &ComputeUnitKey) -> &mut TimeStats {
        self.stats.entry(key.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisional(kernel: &str, object_id: u64) -> ComputeUnitKey {
        ComputeUnitKey::provisional("dev0", kernel, "1024:1:1", "16:1:1", object_id)
    }

    fn timed(registry: &mut ComputeUnitRegistry, key: &ComputeUnitKey, start: f64, end: f64) {
        registry.log_start(key, start);
        registry.log_end(key, end);
    }

    #[test]
    fn test_reconcile_provisional_key() {
        let mut registry = ComputeUnitRegistry::new();
        let key = provisional("vadd", 1);
        timed(&mut registry, &key, 0.0, 4.0);

        let outcome = registry.record_stats("cuA", "vadd", 10.0, 5.0, 1.0, 3, 100);
        let confirmed = key.clone().with_cu("cuA");
        assert_eq!(outcome, Reconciliation::Reconciled(confirmed.clone()));

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&key).is_none());
        let stats = registry.get(&confirmed).unwrap();
        assert_eq!(stats.total_time(), 10.0);
        assert_eq!(stats.max_time(), 5.0);
        assert_eq!(stats.min_time(), 1.0);
        assert_eq!(stats.calls(), 3);
    }

    #[test]
    fn test_known_cu_is_overwritten() {
        let mut registry = ComputeUnitRegistry::new();
        timed(&mut registry, &provisional("vadd", 1), 0.0, 4.0);
        registry.record_stats("cuA", "vadd", 10.0, 5.0, 1.0, 3, 100);

        let outcome = registry.record_stats("cuA", "vadd", 20.0, 8.0, 1.0, 5, 100);
        let confirmed = provisional("vadd", 1).with_cu("cuA");
        assert_eq!(outcome, Reconciliation::Updated(confirmed.clone()));

        assert_eq!(registry.len(), 1);
        let stats = registry.get(&confirmed).unwrap();
        assert_eq!(stats.total_time(), 20.0);
        assert_eq!(stats.calls(), 5);
    }

    #[test]
    fn test_unknown_cu_and_kernel_is_dropped() {
        let mut registry = ComputeUnitRegistry::new();
        timed(&mut registry, &provisional("vadd", 1), 0.0, 4.0);

        let outcome = registry.record_stats("cuB", "vmul", 10.0, 5.0, 1.0, 3, 100);
        assert_eq!(outcome, Reconciliation::Dropped);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&provisional("vadd", 1)).is_some());
    }

    #[test]
    fn test_empty_registry_drops() {
        let mut registry = ComputeUnitRegistry::new();
        assert_eq!(
            registry.record_stats("cuA", "vadd", 1.0, 1.0, 1.0, 1, 100),
            Reconciliation::Dropped
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zero_total_does_not_promote() {
        let mut registry = ComputeUnitRegistry::new();
        let key = provisional("vadd", 1);
        timed(&mut registry, &key, 0.0, 4.0);

        let outcome = registry.record_stats("cuA", "vadd", 0.0, 0.0, 0.0, 0, 100);
        assert_eq!(outcome, Reconciliation::Skipped);
        assert_eq!(registry.get(&key).unwrap().total_time(), 4.0);
    }

    #[test]
    fn test_confirmed_key_of_other_cu_is_not_a_candidate() {
        let mut registry = ComputeUnitRegistry::new();
        let cu_a = provisional("vadd", 1).with_cu("cuA");
        timed(&mut registry, &cu_a, 0.0, 4.0);

        // same kernel, but the only key is already bound to another CU
        let outcome = registry.record_stats("cuB", "vadd", 10.0, 5.0, 1.0, 3, 100);
        assert_eq!(outcome, Reconciliation::Dropped);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_provisional_candidate_in_key_order() {
        let mut registry = ComputeUnitRegistry::new();
        timed(&mut registry, &provisional("vadd", 9), 0.0, 1.0);
        timed(&mut registry, &provisional("vadd", 2), 0.0, 1.0);

        let outcome = registry.record_stats("cuA", "vadd", 3.0, 2.0, 1.0, 2, 100);
        assert_eq!(
            outcome,
            Reconciliation::Reconciled(provisional("vadd", 2).with_cu("cuA"))
        );
        // the other provisional record stays available for the next CU
        assert!(registry.get(&provisional("vadd", 9)).is_some());

        let outcome = registry.record_stats("cuB", "vadd", 4.0, 2.0, 1.0, 2, 100);
        assert_eq!(
            outcome,
            Reconciliation::Reconciled(provisional("vadd", 9).with_cu("cuB"))
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_find_by_device_cu() {
        let mut registry = ComputeUnitRegistry::new();
        let key = provisional("vadd", 1).with_cu("cuA");
        timed(&mut registry, &key, 1.0, 3.0);

        assert_eq!(
            registry.find_by_device_cu("dev0", "cuA").map(|s| s.calls()),
            Some(1)
        );
        assert!(registry.find_by_device_cu("dev1", "cuA").is_none());
        assert!(registry.find_by_device_cu("dev0", "cu").is_none());
    }

    #[test]
    fn test_reconciliation_labels() {
        assert_eq!(Reconciliation::Dropped.label(), "dropped");
        assert_eq!(Reconciliation::Skipped.label(), "skipped");
    }

    #[test]
    fn test_stray_end_creates_no_candidate() {
        let mut registry = ComputeUnitRegistry::new();
        assert!(!registry.log_end(&provisional("vadd", 1), 5.0));
        assert!(registry.is_empty());

        let outcome = registry.record_stats("cuA", "vadd", 10.0, 5.0, 1.0, 3, 100);
        assert_eq!(outcome, Reconciliation::Dropped);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_blank_cu_report_is_dropped() {
        let mut registry = ComputeUnitRegistry::new();
        let key = provisional("vadd", 1);
        timed(&mut registry, &key, 0.0, 4.0);

        let outcome = registry.record_stats("", "vadd", 10.0, 5.0, 1.0, 3, 100);
        assert_eq!(outcome, Reconciliation::Dropped);
        assert_eq!(registry.get(&key).unwrap().total_time(), 4.0);
    }
}
