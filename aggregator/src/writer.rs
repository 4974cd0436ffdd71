//! Summary writer interface
//!
//! The counter never formats text or touches files; it hands typed rows to a
//! [`SummaryWriter`] supplied by the report generator.

use accelprof_shared::types::events::{DurationMs, TransferDirection};
use accelprof_shared::types::trace::{BufferTrace, DeviceTrace, KernelTrace};
use anyhow::Result;
use serde::Serialize;

use crate::stats::{BufferStats, TimeStats};

/// Host ↔ device transfer totals for one accumulator
#[derive(Debug, Clone, Copy)]
pub struct HostTransferSummary<'a> {
    pub direction: TransferDirection,
    pub stats: &'a BufferStats,
    pub total_bytes: u64,
    pub total_tranx: u64,
    /// Observed time floored by the link's maximum rate
    pub total_time_ms: DurationMs,
    pub max_rate_mbps: f64,
}

/// Traffic of one compute-unit port, as measured by the device monitors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelTransferSummary {
    pub device_name: String,
    pub cu_port_name: String,
    pub arg_names: String,
    pub ddr_bank: u32,
    pub direction: TransferDirection,
    pub total_bytes: u64,
    pub total_tranx: u64,
    pub total_kernel_time_ms: DurationMs,
    pub total_transfer_time_ms: DurationMs,
    pub max_rate_mbps: f64,
}

/// Combined read/write traffic of one compute unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopKernelTransferSummary {
    pub device_name: String,
    pub cu_name: String,
    pub write_bytes: u64,
    pub read_bytes: u64,
    pub write_tranx: u64,
    pub read_tranx: u64,
    pub write_time_ms: DurationMs,
    pub read_time_ms: DurationMs,
    pub max_bytes_per_transfer: u32,
    pub max_rate_mbps: f64,
}

/// Capabilities a report generator implements to receive summary rows.
pub trait SummaryWriter {
    /// Start a titled group of rows. Writers without sections ignore it.
    fn begin_section(&mut self, _title: &str) -> Result<()> {
        Ok(())
    }

    /// API call or kernel execution row
    fn write_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()>;

    fn write_compute_unit_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()>;

    fn write_accelerator_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()>;

    /// Device buffer row, e.g. `DEVICE READ BUFFER`
    fn write_buffer_summary(&mut self, name: &str, stats: &BufferStats) -> Result<()>;

    fn write_host_transfer_summary(&mut self, summary: &HostTransferSummary<'_>) -> Result<()>;

    fn write_kernel_transfer_summary(&mut self, summary: &KernelTransferSummary) -> Result<()>;

    fn write_top_kernel_transfer_summary(
        &mut self,
        summary: &TopKernelTransferSummary,
    ) -> Result<()>;

    fn write_kernel_trace(&mut self, trace: &KernelTrace) -> Result<()>;

    fn write_buffer_trace(&mut self, trace: &BufferTrace) -> Result<()>;

    fn write_device_trace(&mut self, trace: &DeviceTrace) -> Result<()>;
}
