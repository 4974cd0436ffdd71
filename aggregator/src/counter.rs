//! Performance counter
//!
//! [`PerformanceCounter`] is the aggregate root of one profiling session. It
//! routes every ingested event to the matching accumulator or top-usage list
//! and, at the end of the session, hands the results to a [`SummaryWriter`].
//!
//! The counter does no locking: ingestion takes `&mut self`, so producers on
//! several threads must share it behind a single `Mutex`.

use std::collections::BTreeMap;

use accelprof_shared::types::events::{
    CounterEvent, DeviceEvent, DurationMs, Timestamp, TransferDirection,
};
use accelprof_shared::types::key::ComputeUnitKey;
use accelprof_shared::types::trace::{BufferTrace, DeviceTrace, KernelTrace};
use anyhow::Result;
use tracing::{debug, info};

use crate::config::CounterConfig;
use crate::metrics;
use crate::registry::{ComputeUnitRegistry, Reconciliation};
use crate::stats::{BufferStats, TimeStats};
use crate::top_usage::TopUsage;
use crate::writer::{
    HostTransferSummary, KernelTransferSummary, SummaryWriter, TopKernelTransferSummary,
};

/// Bucket all kernel-port traffic is logged under.
///
/// The hardware metadata available today does not identify which compute
/// unit issued a transaction, so kernel traffic is not split per CU.
pub const KERNEL_TRANSFER_BUCKET: &str = "ALL";

/// Total time of one compute unit, and where the number came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputeUnitTime {
    pub total_time: DurationMs,
    /// True when no record matched the CU and the device-wide kernel
    /// execution time was returned instead
    pub is_fallback: bool,
}

/// Host transfer accumulators, optionally partitioned per context
#[derive(Debug, Clone)]
struct HostTransferStats {
    per_context: bool,
    stats: BTreeMap<u32, BufferStats>,
}

impl HostTransferStats {
    fn new(per_context: bool) -> Self {
        Self {
            per_context,
            stats: BTreeMap::new(),
        }
    }

    fn log(&mut self, size: u64, duration: DurationMs, context_id: u32, num_devices: u32) {
        let slot = if self.per_context { context_id } else { 0 };
        let stats = self.stats.entry(slot).or_default();
        stats.log(size, duration);
        stats.set_context_id(context_id);
        stats.set_num_devices(num_devices);
    }

    fn iter(&self) -> impl Iterator<Item = &BufferStats> {
        self.stats.values()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut BufferStats> {
        self.stats.values_mut()
    }
}

/// Session-scoped aggregation of all profiling events
#[derive(Debug, Clone)]
pub struct PerformanceCounter {
    config: CounterConfig,

    top_kernels: TopUsage<KernelTrace>,
    top_buffer_reads: TopUsage<BufferTrace>,
    top_buffer_writes: TopUsage<BufferTrace>,
    top_kernel_reads: TopUsage<DeviceTrace>,
    top_kernel_writes: TopUsage<DeviceTrace>,
    top_device_buffer_reads: TopUsage<DeviceTrace>,
    top_device_buffer_writes: TopUsage<DeviceTrace>,

    function_calls: BTreeMap<String, TimeStats>,
    kernel_executions: BTreeMap<String, TimeStats>,
    compute_units: ComputeUnitRegistry,

    host_reads: HostTransferStats,
    host_writes: HostTransferStats,
    device_buffer_reads: BufferStats,
    device_buffer_writes: BufferStats,
    device_kernel: BufferStats,
    kernel_transfer_reads: BTreeMap<String, BufferStats>,
    kernel_transfer_writes: BTreeMap<String, BufferStats>,

    /// Earliest kernel start per device
    device_start_times: BTreeMap<String, Timestamp>,
    /// Latest kernel end per device
    device_end_times: BTreeMap<String, Timestamp>,
    /// Earliest compute-unit start per device
    device_cu_start_times: BTreeMap<String, Timestamp>,
}

impl Default for PerformanceCounter {
    fn default() -> Self {
        Self::new(CounterConfig::default())
    }
}

impl PerformanceCounter {
    /// Create a counter for a new profiling session
    pub fn new(config: CounterConfig) -> Self {
        let kernels = config.top_kernel_limit;
        let transfers = config.top_transfer_limit;
        Self {
            top_kernels: TopUsage::new(kernels),
            top_buffer_reads: TopUsage::new(transfers),
            top_buffer_writes: TopUsage::new(transfers),
            top_kernel_reads: TopUsage::new(transfers),
            top_kernel_writes: TopUsage::new(transfers),
            top_device_buffer_reads: TopUsage::new(transfers),
            top_device_buffer_writes: TopUsage::new(transfers),
            function_calls: BTreeMap::new(),
            kernel_executions: BTreeMap::new(),
            compute_units: ComputeUnitRegistry::new(),
            host_reads: HostTransferStats::new(config.per_context_buffer_stats),
            host_writes: HostTransferStats::new(config.per_context_buffer_stats),
            device_buffer_reads: BufferStats::new(),
            device_buffer_writes: BufferStats::new(),
            device_kernel: BufferStats::new(),
            kernel_transfer_reads: BTreeMap::new(),
            kernel_transfer_writes: BTreeMap::new(),
            device_start_times: BTreeMap::new(),
            device_end_times: BTreeMap::new(),
            device_cu_start_times: BTreeMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    // ── Ingestion ────────────────────────────────────────────────────────────

    pub fn log_buffer_read(&mut self, size: u64, duration: DurationMs, context_id: u32, num_devices: u32) {
        self.host_reads.log(size, duration, context_id, num_devices);
    }

    pub fn log_buffer_write(&mut self, size: u64, duration: DurationMs, context_id: u32, num_devices: u32) {
        self.host_writes.log(size, duration, context_id, num_devices);
    }

    pub fn log_device_read(&mut self, size: u64, duration: DurationMs) {
        self.device_buffer_reads.log(size, duration);
    }

    pub fn log_device_write(&mut self, size: u64, duration: DurationMs) {
        self.device_buffer_writes.log(size, duration);
    }

    pub fn log_device_kernel(&mut self, size: u64, duration: DurationMs) {
        self.device_kernel.log(size, duration);
    }

    /// Log kernel-port traffic. Device and kernel are accepted for the day
    /// per-CU attribution is possible; everything lands in
    /// [`KERNEL_TRANSFER_BUCKET`] for now.
    #[allow(clippy::too_many_arguments)]
    pub fn log_device_kernel_transfer(
        &mut self,
        _device_name: &str,
        _kernel_name: &str,
        size: u64,
        duration: DurationMs,
        bit_width: u32,
        clock_freq_mhz: f64,
        direction: TransferDirection,
    ) {
        let buckets = match direction {
            TransferDirection::Read => &mut self.kernel_transfer_reads,
            TransferDirection::Write => &mut self.kernel_transfer_writes,
        };
        buckets
            .entry(KERNEL_TRANSFER_BUCKET.to_string())
            .or_default()
            .log_with_link(size, duration, bit_width, clock_freq_mhz);
    }

    pub fn log_function_call_start(&mut self, function_name: &str, timestamp: Timestamp) {
        self.function_calls
            .entry(function_name.to_string())
            .or_default()
            .log_start(timestamp);
    }

    pub fn log_function_call_end(&mut self, function_name: &str, timestamp: Timestamp) {
        let counted = close_interval(&mut self.function_calls, function_name, timestamp);
        if !counted {
            unmatched_end("function_call", function_name);
        }
    }

    pub fn log_kernel_execution_start(&mut self, kernel_name: &str, device_name: &str, timestamp: Timestamp) {
        self.kernel_executions
            .entry(kernel_name.to_string())
            .or_default()
            .log_start(timestamp);
        keep_earliest(&mut self.device_start_times, device_name, timestamp);
    }

    pub fn log_kernel_execution_end(&mut self, kernel_name: &str, device_name: &str, timestamp: Timestamp) {
        let counted = close_interval(&mut self.kernel_executions, kernel_name, timestamp);
        if !counted {
            unmatched_end("kernel_execution", kernel_name);
        }
        keep_latest(&mut self.device_end_times, device_name, timestamp);
    }

    pub fn log_compute_unit_device_start(&mut self, device_name: &str, timestamp: Timestamp) {
        keep_earliest(&mut self.device_cu_start_times, device_name, timestamp);
    }

    pub fn log_compute_unit_execution_start(&mut self, key: &ComputeUnitKey, timestamp: Timestamp) {
        self.compute_units.log_start(key, timestamp);
    }

    pub fn log_compute_unit_execution_end(&mut self, key: &ComputeUnitKey, timestamp: Timestamp) {
        if !self.compute_units.log_end(key, timestamp) {
            unmatched_end("compute_unit_execution", &key.summary_name());
        }
    }

    /// Apply statistics the device aggregated for one compute unit.
    ///
    /// See [`ComputeUnitRegistry::record_stats`] for how reports that arrive
    /// before the CU name is known are reconciled.
    #[allow(clippy::too_many_arguments)]
    pub fn log_compute_unit_stats(
        &mut self,
        cu_name: &str,
        kernel_name: &str,
        total_time: DurationMs,
        max_time: DurationMs,
        min_time: DurationMs,
        calls: u32,
        clock_freq_mhz: u32,
    ) -> Reconciliation {
        let outcome = self.compute_units.record_stats(
            cu_name,
            kernel_name,
            total_time,
            max_time,
            min_time,
            calls,
            clock_freq_mhz,
        );
        metrics::CU_STATS_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();
        match &outcome {
            Reconciliation::Reconciled(key) => {
                debug!("Compute unit {} reconciled as {}", cu_name, key.summary_name());
            }
            Reconciliation::Dropped => {
                debug!(
                    "Dropping stats for compute unit {} (kernel {}): no matching record",
                    cu_name, kernel_name
                );
            }
            Reconciliation::Updated(_) | Reconciliation::Skipped => {}
        }
        outcome
    }

    /// Route a device transfer by its flags
    pub fn log_device_event(&mut self, event: &DeviceEvent) {
        if event.is_kernel {
            self.log_device_kernel(event.size, event.duration);
        } else if event.is_kernel_transfer {
            self.log_device_kernel_transfer(
                &event.device_name,
                &event.kernel_name,
                event.size,
                event.duration,
                event.bit_width,
                event.clock_freq_mhz,
                TransferDirection::from_is_read(event.is_read),
            );
        } else if event.is_read {
            self.log_device_read(event.size, event.duration);
        } else {
            self.log_device_write(event.size, event.duration);
        }
    }

    pub fn push_kernel_trace(&mut self, trace: KernelTrace) {
        record_eviction("kernel", self.top_kernels.push(trace));
    }

    pub fn push_buffer_trace(&mut self, trace: BufferTrace, direction: TransferDirection) {
        let evicted = match direction {
            TransferDirection::Read => self.top_buffer_reads.push(trace),
            TransferDirection::Write => self.top_buffer_writes.push(trace),
        };
        record_eviction("host_buffer", evicted);
    }

    pub fn push_device_trace(&mut self, trace: DeviceTrace, direction: TransferDirection, is_kernel: bool) {
        let (list, evicted) = match (is_kernel, direction) {
            (true, TransferDirection::Read) => ("kernel_port", self.top_kernel_reads.push(trace)),
            (true, TransferDirection::Write) => ("kernel_port", self.top_kernel_writes.push(trace)),
            (false, TransferDirection::Read) => {
                ("device_buffer", self.top_device_buffer_reads.push(trace))
            }
            (false, TransferDirection::Write) => {
                ("device_buffer", self.top_device_buffer_writes.push(trace))
            }
        };
        record_eviction(list, evicted);
    }

    /// Route any producer event to its ingestion method
    pub fn apply(&mut self, event: CounterEvent) {
        metrics::EVENTS_TOTAL.with_label_values(&[event.kind()]).inc();

        match event {
            CounterEvent::BufferTransfer {
                direction,
                size,
                duration,
                context_id,
                num_devices,
            } => match direction {
                TransferDirection::Read => {
                    self.log_buffer_read(size, duration, context_id, num_devices)
                }
                TransferDirection::Write => {
                    self.log_buffer_write(size, duration, context_id, num_devices)
                }
            },
            CounterEvent::Device(ev) => self.log_device_event(&ev),
            CounterEvent::FunctionCallStart { name, timestamp } => {
                self.log_function_call_start(&name, timestamp)
            }
            CounterEvent::FunctionCallEnd { name, timestamp } => {
                self.log_function_call_end(&name, timestamp)
            }
            CounterEvent::KernelExecutionStart {
                kernel_name,
                device_name,
                timestamp,
            } => self.log_kernel_execution_start(&kernel_name, &device_name, timestamp),
            CounterEvent::KernelExecutionEnd {
                kernel_name,
                device_name,
                timestamp,
            } => self.log_kernel_execution_end(&kernel_name, &device_name, timestamp),
            CounterEvent::ComputeUnitExecutionStart { key, timestamp } => {
                self.log_compute_unit_execution_start(&key, timestamp)
            }
            CounterEvent::ComputeUnitExecutionEnd { key, timestamp } => {
                self.log_compute_unit_execution_end(&key, timestamp)
            }
            CounterEvent::ComputeUnitDeviceStart {
                device_name,
                timestamp,
            } => self.log_compute_unit_device_start(&device_name, timestamp),
            CounterEvent::ComputeUnitStats {
                cu_name,
                kernel_name,
                total_time,
                max_time,
                min_time,
                calls,
                clock_freq_mhz,
            } => {
                self.log_compute_unit_stats(
                    &cu_name,
                    &kernel_name,
                    total_time,
                    max_time,
                    min_time,
                    calls,
                    clock_freq_mhz,
                );
            }
            CounterEvent::KernelTrace(trace) => self.push_kernel_trace(trace),
            CounterEvent::BufferTrace { direction, trace } => {
                self.push_buffer_trace(trace, direction)
            }
            CounterEvent::DeviceTrace {
                direction,
                is_kernel,
                trace,
            } => self.push_device_trace(trace, direction, is_kernel),
        }
    }

    // ── Link annotation ──────────────────────────────────────────────────────

    pub fn set_all_device_buffer_bit_width(&mut self, bit_width: u32) {
        self.device_buffer_reads.set_bit_width(bit_width);
        self.device_buffer_writes.set_bit_width(bit_width);
        for stats in self.host_reads.iter_mut().chain(self.host_writes.iter_mut()) {
            stats.set_bit_width(bit_width);
        }
    }

    pub fn set_all_device_kernel_bit_width(&mut self, bit_width: u32) {
        self.device_kernel.set_bit_width(bit_width);
    }

    pub fn set_all_device_clock_freq_mhz(&mut self, clock_freq_mhz: f64) {
        self.device_buffer_reads.set_clock_freq_mhz(clock_freq_mhz);
        self.device_buffer_writes.set_clock_freq_mhz(clock_freq_mhz);
        self.device_kernel.set_clock_freq_mhz(clock_freq_mhz);
        for stats in self.host_reads.iter_mut().chain(self.host_writes.iter_mut()) {
            stats.set_clock_freq_mhz(clock_freq_mhz);
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Earliest kernel start on the device, 0 if it ran nothing
    pub fn device_start_time(&self, device_name: &str) -> Timestamp {
        self.device_start_times
            .get(device_name)
            .copied()
            .unwrap_or(0.0)
    }

    /// Earliest compute-unit start on the device, 0 if none was logged
    pub fn device_cu_start_time(&self, device_name: &str) -> Timestamp {
        self.device_cu_start_times
            .get(device_name)
            .copied()
            .unwrap_or(0.0)
    }

    /// Span from the first kernel start to the last kernel end on the device
    pub fn total_kernel_execution_time(&self, device_name: &str) -> DurationMs {
        match (
            self.device_start_times.get(device_name),
            self.device_end_times.get(device_name),
        ) {
            (Some(start), Some(end)) => {
                let total = end - start;
                debug!(
                    "Total kernel time = {} - {} = {} for device {}",
                    end, start, total, device_name
                );
                total
            }
            _ => 0.0,
        }
    }

    pub fn compute_unit_calls(&self, device_name: &str, cu_name: &str) -> u64 {
        self.compute_units
            .find_by_device_cu(device_name, cu_name)
            .map(TimeStats::calls)
            .unwrap_or(0)
    }

    /// Total time of a compute unit, falling back to the device's kernel
    /// execution time when no record of the CU exists.
    pub fn compute_unit_total_time(&self, device_name: &str, cu_name: &str) -> ComputeUnitTime {
        match self.compute_units.find_by_device_cu(device_name, cu_name) {
            Some(stats) => ComputeUnitTime {
                total_time: stats.total_time(),
                is_fallback: false,
            },
            None => {
                debug!(
                    "No record for compute unit {} on {}, using device kernel time",
                    cu_name, device_name
                );
                ComputeUnitTime {
                    total_time: self.total_kernel_execution_time(device_name),
                    is_fallback: true,
                }
            }
        }
    }

    pub fn function_calls(&self) -> &BTreeMap<String, TimeStats> {
        &self.function_calls
    }

    pub fn kernel_executions(&self) -> &BTreeMap<String, TimeStats> {
        &self.kernel_executions
    }

    pub fn compute_units(&self) -> &ComputeUnitRegistry {
        &self.compute_units
    }

    /// Host transfer accumulators, one per context when partitioned
    pub fn host_transfer_stats(&self, direction: TransferDirection) -> impl Iterator<Item = &BufferStats> {
        match direction {
            TransferDirection::Read => self.host_reads.iter(),
            TransferDirection::Write => self.host_writes.iter(),
        }
    }

    pub fn device_transfer_stats(&self, direction: TransferDirection) -> &BufferStats {
        match direction {
            TransferDirection::Read => &self.device_buffer_reads,
            TransferDirection::Write => &self.device_buffer_writes,
        }
    }

    pub fn device_kernel_stats(&self) -> &BufferStats {
        &self.device_kernel
    }

    pub fn kernel_transfer_stats(&self, direction: TransferDirection) -> &BTreeMap<String, BufferStats> {
        match direction {
            TransferDirection::Read => &self.kernel_transfer_reads,
            TransferDirection::Write => &self.kernel_transfer_writes,
        }
    }

    pub fn top_kernels(&self) -> &TopUsage<KernelTrace> {
        &self.top_kernels
    }

    pub fn top_buffer_transfers(&self, direction: TransferDirection) -> &TopUsage<BufferTrace> {
        match direction {
            TransferDirection::Read => &self.top_buffer_reads,
            TransferDirection::Write => &self.top_buffer_writes,
        }
    }

    pub fn top_device_transfers(&self, direction: TransferDirection, is_kernel: bool) -> &TopUsage<DeviceTrace> {
        match (is_kernel, direction) {
            (true, TransferDirection::Read) => &self.top_kernel_reads,
            (true, TransferDirection::Write) => &self.top_kernel_writes,
            (false, TransferDirection::Read) => &self.top_device_buffer_reads,
            (false, TransferDirection::Write) => &self.top_device_buffer_writes,
        }
    }

    // ── Summaries ────────────────────────────────────────────────────────────

    pub fn write_top_kernel_summary(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        self.top_kernels.write_summary(writer)
    }

    /// Same list as the top kernel summary; the hardware report reuses it
    pub fn write_top_hardware_summary(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        self.top_kernels.write_summary(writer)
    }

    /// Longest host buffer transfers
    pub fn write_top_data_transfer_summary(
        &self,
        writer: &mut dyn SummaryWriter,
        direction: TransferDirection,
    ) -> Result<()> {
        self.top_buffer_transfers(direction).write_summary(writer)
    }

    /// Longest device-side buffer transfers
    pub fn write_top_device_transfer_summary(
        &self,
        writer: &mut dyn SummaryWriter,
        direction: TransferDirection,
    ) -> Result<()> {
        self.top_device_transfers(direction, false).write_summary(writer)
    }

    /// Longest kernel-port transfers
    pub fn write_top_kernel_transfer_trace_summary(
        &self,
        writer: &mut dyn SummaryWriter,
        direction: TransferDirection,
    ) -> Result<()> {
        self.top_device_transfers(direction, true).write_summary(writer)
    }

    pub fn write_kernel_summary(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        for (kernel_name, stats) in &self.kernel_executions {
            writer.write_summary(kernel_name, stats)?;
        }
        Ok(())
    }

    pub fn write_compute_unit_summary(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        for (key, stats) in self.compute_units.iter() {
            writer.write_compute_unit_summary(&key.summary_name(), stats)?;
        }
        Ok(())
    }

    pub fn write_accelerator_summary(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        for (key, stats) in self.compute_units.iter() {
            writer.write_accelerator_summary(&key.summary_name(), stats)?;
        }
        Ok(())
    }

    /// API calls, longest total time first. Equal totals keep name order.
    pub fn write_api_summary(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        let mut calls: Vec<(&String, &TimeStats)> = self.function_calls.iter().collect();
        calls.sort_by(|a, b| b.1.total_time().total_cmp(&a.1.total_time()));

        info!("Writing API summary for {} functions", calls.len());
        for (name, stats) in calls {
            writer.write_summary(name, stats)?;
        }
        Ok(())
    }

    /// One row per host accumulator in `direction`
    pub fn write_host_transfer_summary(
        &self,
        writer: &mut dyn SummaryWriter,
        direction: TransferDirection,
        max_rate_mbps: f64,
    ) -> Result<()> {
        for stats in self.host_transfer_stats(direction) {
            writer.write_host_transfer_summary(&HostTransferSummary {
                direction,
                stats,
                total_bytes: stats.total_bytes(),
                total_tranx: stats.count(),
                total_time_ms: stats.effective_time_ms(max_rate_mbps),
                max_rate_mbps,
            })?;
        }
        Ok(())
    }

    /// Forward a kernel port row computed from device monitor counters
    pub fn write_kernel_transfer_summary(
        &self,
        writer: &mut dyn SummaryWriter,
        summary: &KernelTransferSummary,
    ) -> Result<()> {
        writer.write_kernel_transfer_summary(summary)
    }

    /// Forward a per-CU read/write traffic row
    pub fn write_top_kernel_transfer_summary(
        &self,
        writer: &mut dyn SummaryWriter,
        summary: &TopKernelTransferSummary,
    ) -> Result<()> {
        writer.write_top_kernel_transfer_summary(summary)
    }

    pub fn write_device_transfer_summary(
        &self,
        writer: &mut dyn SummaryWriter,
        direction: TransferDirection,
    ) -> Result<()> {
        let name = match direction {
            TransferDirection::Read => "DEVICE READ BUFFER",
            TransferDirection::Write => "DEVICE WRITE BUFFER",
        };
        writer.write_buffer_summary(name, self.device_transfer_stats(direction))
    }
}

fn keep_earliest(times: &mut BTreeMap<String, Timestamp>, device_name: &str, timestamp: Timestamp) {
    match times.get_mut(device_name) {
        Some(earliest) if timestamp < *earliest => *earliest = timestamp,
        Some(_) => {}
        None => {
            times.insert(device_name.to_string(), timestamp);
        }
    }
}

fn keep_latest(times: &mut BTreeMap<String, Timestamp>, device_name: &str, timestamp: Timestamp) {
    match times.get_mut(device_name) {
        Some(latest) if timestamp > *latest => *latest = timestamp,
        Some(_) => {}
        None => {
            times.insert(device_name.to_string(), timestamp);
        }
    }
}

/// End the open interval of `name`, if there is one. Unknown names are not
/// inserted.
fn close_interval(
    stats: &mut BTreeMap<String, TimeStats>,
    name: &str,
    timestamp: Timestamp,
) -> bool {
    stats
        .get_mut(name)
        .map_or(false, |open| open.log_end(timestamp))
}

fn unmatched_end(kind: &str, name: &str) {
    debug!("Ignoring {} end for {}: no start recorded", kind, name);
    metrics::UNMATCHED_ENDS_TOTAL.with_label_values(&[kind]).inc();
}

fn record_eviction<T>(list: &str, evicted: Option<T>) {
    if evicted.is_some() {
        metrics::TOP_USAGE_EVICTIONS.with_label_values(&[list]).inc();
    }
}
