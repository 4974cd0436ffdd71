//! Text table output
//!
//! Renders summary rows as aligned text sections, one column layout per row
//! kind. A header is printed before the first row of each layout.

use accelprof_aggregator::writer::{
    HostTransferSummary, KernelTransferSummary, TopKernelTransferSummary,
};
use accelprof_aggregator::{BufferStats, SummaryWriter, TimeStats};
use accelprof_shared::{BufferTrace, DeviceTrace, KernelTrace};
use anyhow::Result;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Time,
    Buffer,
    HostTransfer,
    KernelTransfer,
    TopKernelTransfer,
    KernelTrace,
    BufferTrace,
    DeviceTrace,
}

impl Layout {
    fn header(self) -> String {
        match self {
            Layout::Time => format!(
                "{:<48} {:>8} {:>12} {:>12} {:>12} {:>12}",
                "Name", "Calls", "Total(ms)", "Avg(ms)", "Min(ms)", "Max(ms)"
            ),
            Layout::Buffer => format!(
                "{:<24} {:>10} {:>14} {:>12} {:>12} {:>12}",
                "Name", "Transfers", "Bytes", "Time(ms)", "AvgSize(B)", "AvgTime(ms)"
            ),
            Layout::HostTransfer => format!(
                "{:<6} {:>8} {:>8} {:>10} {:>14} {:>12} {:>12} {:>12}",
                "Dir", "Context", "Devices", "Transfers", "Bytes", "Time(ms)", "Rate(MB/s)", "Max(MB/s)"
            ),
            Layout::KernelTransfer => format!(
                "{:<16} {:<32} {:<16} {:>5} {:<5} {:>10} {:>14} {:>12} {:>12} {:>12}",
                "Device",
                "Port",
                "Args",
                "Bank",
                "Dir",
                "Transfers",
                "Bytes",
                "Kernel(ms)",
                "Xfer(ms)",
                "Max(MB/s)"
            ),
            Layout::TopKernelTransfer => format!(
                "{:<16} {:<24} {:>10} {:>14} {:>10} {:>14} {:>12} {:>12} {:>12}",
                "Device",
                "Compute Unit",
                "Wr.Tranx",
                "Wr.Bytes",
                "Rd.Tranx",
                "Rd.Bytes",
                "Wr(ms)",
                "Rd(ms)",
                "MaxBytes/Tx"
            ),
            Layout::KernelTrace => format!(
                "{:<24} {:<16} {:>14} {:>12} {:>16}",
                "Kernel", "Device", "Start(ms)", "Duration(ms)", "Global Work"
            ),
            Layout::BufferTrace => format!(
                "{:>18} {:>8} {:>8} {:>12} {:>14} {:>12} {:>12}",
                "Address", "Context", "Queue", "Size", "Start(ms)", "Duration(ms)", "Rate(MB/s)"
            ),
            Layout::DeviceTrace => format!(
                "{:<16} {:<24} {:>14} {:>12} {:>12} {:>8}",
                "Device", "Name", "Start(ms)", "Duration(ms)", "Bytes", "Burst"
            ),
        }
    }
}

/// [`SummaryWriter`] producing aligned text sections
pub struct TableWriter<W: Write> {
    out: W,
    layout: Option<Layout>,
    sections: usize,
    section_rows: usize,
}

impl<W: Write> TableWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            layout: None,
            sections: 0,
            section_rows: 0,
        }
    }

    /// Close the last section and flush
    pub fn finish(mut self) -> Result<W> {
        self.close_section()?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn close_section(&mut self) -> Result<()> {
        if self.sections > 0 && self.section_rows == 0 {
            writeln!(self.out, "No data.")?;
        }
        Ok(())
    }

    /// Write the column header if `layout` differs from the previous row's
    fn row(&mut self, layout: Layout) -> Result<()> {
        if self.layout != Some(layout) {
            let header = layout.header();
            writeln!(self.out, "{}", header)?;
            writeln!(self.out, "{:-<1$}", "", header.len())?;
            self.layout = Some(layout);
        }
        self.section_rows += 1;
        Ok(())
    }

    fn time_row(&mut self, name: &str, stats: &TimeStats) -> Result<()> {
        self.row(Layout::Time)?;
        writeln!(
            self.out,
            "{:<48} {:>8} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
            name,
            stats.calls(),
            stats.total_time(),
            stats.average_time(),
            stats.min_time(),
            stats.max_time()
        )?;
        Ok(())
    }
}

fn rate_mbps(bytes: u64, time_ms: f64) -> f64 {
    if time_ms <= 0.0 {
        0.0
    } else {
        bytes as f64 / (1000.0 * time_ms)
    }
}

impl<W: Write> SummaryWriter for TableWriter<W> {
    fn begin_section(&mut self, title: &str) -> Result<()> {
        self.close_section()?;
        if self.sections > 0 {
            writeln!(self.out)?;
        }
        writeln!(self.out, "{}", title)?;
        writeln!(self.out, "{:=<1$}", "", title.len())?;

        self.sections += 1;
        self.section_rows = 0;
        self.layout = None;
        Ok(())
    }

    fn write_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()> {
        self.time_row(name, stats)
    }

    fn write_compute_unit_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()> {
        self.time_row(name, stats)
    }

    fn write_accelerator_summary(&mut self, name: &str, stats: &TimeStats) -> Result<()> {
        self.time_row(name, stats)
    }

    fn write_buffer_summary(&mut self, name: &str, stats: &BufferStats) -> Result<()> {
        self.row(Layout::Buffer)?;
        writeln!(
            self.out,
            "{:<24} {:>10} {:>14} {:>12.3} {:>12.1} {:>12.3}",
            name,
            stats.count(),
            stats.total_bytes(),
            stats.total_time(),
            stats.average_size(),
            stats.average_time()
        )?;
        Ok(())
    }

    fn write_host_transfer_summary(&mut self, summary: &HostTransferSummary<'_>) -> Result<()> {
        self.row(Layout::HostTransfer)?;
        writeln!(
            self.out,
            "{:<6} {:>8} {:>8} {:>10} {:>14} {:>12.3} {:>12.1} {:>12.1}",
            summary.direction.as_str(),
            summary.stats.context_id(),
            summary.stats.num_devices(),
            summary.total_tranx,
            summary.total_bytes,
            summary.total_time_ms,
            rate_mbps(summary.total_bytes, summary.total_time_ms),
            summary.max_rate_mbps
        )?;
        Ok(())
    }

    fn write_kernel_transfer_summary(&mut self, summary: &KernelTransferSummary) -> Result<()> {
        self.row(Layout::KernelTransfer)?;
        writeln!(
            self.out,
            "{:<16} {:<32} {:<16} {:>5} {:<5} {:>10} {:>14} {:>12.3} {:>12.3} {:>12.1}",
            summary.device_name,
            summary.cu_port_name,
            summary.arg_names,
            summary.ddr_bank,
            summary.direction.as_str(),
            summary.total_tranx,
            summary.total_bytes,
            summary.total_kernel_time_ms,
            summary.total_transfer_time_ms,
            summary.max_rate_mbps
        )?;
        Ok(())
    }

    fn write_top_kernel_transfer_summary(
        &mut self,
        summary: &TopKernelTransferSummary,
    ) -> Result<()> {
        self.row(Layout::TopKernelTransfer)?;
        writeln!(
            self.out,
            "{:<16} {:<24} {:>10} {:>14} {:>10} {:>14} {:>12.3} {:>12.3} {:>12}",
            summary.device_name,
            summary.cu_name,
            summary.write_tranx,
            summary.write_bytes,
            summary.read_tranx,
            summary.read_bytes,
            summary.write_time_ms,
            summary.read_time_ms,
            summary.max_bytes_per_transfer
        )?;
        Ok(())
    }

    fn write_kernel_trace(&mut self, trace: &KernelTrace) -> Result<()> {
        self.row(Layout::KernelTrace)?;
        let [x, y, z] = trace.global_work_size;
        writeln!(
            self.out,
            "{:<24} {:<16} {:>14.3} {:>12.3} {:>16}",
            trace.kernel_name,
            trace.device_name,
            trace.start,
            trace.duration(),
            format!("{}x{}x{}", x, y, z)
        )?;
        Ok(())
    }

    fn write_buffer_trace(&mut self, trace: &BufferTrace) -> Result<()> {
        self.row(Layout::BufferTrace)?;
        writeln!(
            self.out,
            "{:>18} {:>8} {:>8} {:>12} {:>14.3} {:>12.3} {:>12.1}",
            format!("0x{:x}", trace.address),
            trace.context_id,
            trace.command_queue_id,
            trace.size,
            trace.start,
            trace.duration(),
            trace.transfer_rate_mbps()
        )?;
        Ok(())
    }

    fn write_device_trace(&mut self, trace: &DeviceTrace) -> Result<()> {
        self.row(Layout::DeviceTrace)?;
        writeln!(
            self.out,
            "{:<16} {:<24} {:>14.3} {:>12.3} {:>12} {:>8}",
            trace.device_name,
            trace.name,
            trace.start,
            trace.duration(),
            trace.num_bytes,
            trace.burst_length
        )?;
        Ok(())
    }
}
