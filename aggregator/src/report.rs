//! In-memory summary report
//!
//! [`CollectingWriter`] records every row it is handed, in order, as owned
//! [`SummaryRow`] values that can be inspected or serialized.

use accelprof_shared::types::events::{DurationMs, TransferDirection};
use accelprof_shared::types::trace::{BufferTrace, DeviceTrace, KernelTrace};
use anyhow::Result;
use serde::Serialize;

use crate::stats::{BufferStats, TimeStats};
use crate::writer::{
    HostTransferSummary, KernelTransferSummary, SummaryWriter, TopKernelTransferSummary,
};

/// Owned copy of a host transfer row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostTransferRow {
    pub direction: TransferDirection,
    pub stats: BufferStats,
    pub total_bytes: u64,
    pub total_tranx: u64,
    pub total_time_ms: DurationMs,
    pub max_rate_mbps: f64,
}

impl From<&HostTransferSummary<'_>> for HostTransferRow {
    fn from(summary: &HostTransferSummary<'_>) -> Self {
        Self {
            direction: summary.direction,
            stats: summary.stats.clone(),
            total_bytes: summary.total_bytes,
            total_tranx: summary.total_tranx,
            total_time_ms: summary.total_time_ms,
            max_rate_mbps: summary.max_rate_mbps,
        }
    }
}

/// One row handed to a summary writer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum SummaryRow {
    Call { name: String, stats: TimeStats },
    ComputeUnit { name: String, stats: TimeStats },
    Accelerator { name: String, stats: TimeStats },
    Buffer { name: String, stats: BufferStats },
    HostTransfer(HostTransferRow),
    KernelTransfer(KernelTransferSummary),
    TopKernelTransfer(TopKernelTransferSummary),
    KernelTrace(KernelTrace),
    BufferTrace(BufferTrace),
    DeviceTrace(DeviceTrace),
}

/// Writer that keeps every row in memory
#[derive(Debug, Default)]
pub struct CollectingWriter {
    rows: Vec<SummaryRow>,
}

impl CollectingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<SummaryRow> {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the call/kernel rows, in emission order
    pub fn call_names(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                SummaryRow::Call { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl SummaryWriter for CollectingWriter {
    fn write_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()> {
        self.rows.push(SummaryRow::Call {
            name: name.to_string(),
            stats: stats.clone(),
        });
        Ok(())
    }

    fn write_compute_unit_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()> {
        self.rows.push(SummaryRow::ComputeUnit {
            name: name.to_string(),
            stats: stats.clone(),
        });
        Ok(())
    }

    fn write_accelerator_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()> {
        self.rows.push(SummaryRow::Accelerator {
            name: name.to_string(),
            stats: stats.clone(),
        });
        Ok(())
    }

    fn write_buffer_summary(&mut self, name: &str, stats: &BufferStats) -> Result<()> {
        self.rows.push(SummaryRow::Buffer {
            name: name.to_string(),
            stats: stats.clone(),
        });
        Ok(())
    }

    fn write_host_transfer_summary(&mut self, summary: &HostTransferSummary<'_>) -> Result<()> {
        self.rows.push(SummaryRow::HostTransfer(summary.into()));
        Ok(())
    }

    fn write_kernel_transfer_summary(&mut self, summary: &KernelTransferSummary) -> Result<()> {
        self.rows.push(SummaryRow::KernelTransfer(summary.clone()));
        Ok(())
    }

    fn write_top_kernel_transfer_summary(
        &mut self,
        summary: &TopKernelTransferSummary,
    ) -> Result<()> {
        self.rows.push(SummaryRow::TopKernelTransfer(summary.clone()));
        Ok(())
    }

    fn write_kernel_trace(&mut self, trace: &KernelTrace) -> Result<()> {
        self.rows.push(SummaryRow::KernelTrace(trace.clone()));
        Ok(())
    }

    fn write_buffer_trace(&mut self, trace: &BufferTrace) -> Result<()> {
        self.rows.push(SummaryRow::BufferTrace(trace.clone()));
        Ok(())
    }

    fn write_device_trace(&mut self, trace: &DeviceTrace) -> Result<()> {
        self.rows.push(SummaryRow::DeviceTrace(trace.clone()));
        Ok(())
    }
}
