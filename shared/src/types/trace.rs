//! Trace records retained for top-usage reporting
//!
//! A trace is a snapshot of one event, kept only while it ranks among the
//! longest of its kind.

use serde::{Deserialize, Serialize};

use super::events::{DurationMs, Timestamp};

/// One kernel enqueue, from start to end of execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelTrace {
    /// Runtime address of the kernel event
    #[serde(default)]
    pub address: u64,
    pub kernel_name: String,
    pub device_name: String,
    #[serde(default)]
    pub context_id: u32,
    #[serde(default)]
    pub command_queue_id: u32,
    pub start: Timestamp,
    pub end: Timestamp,
    #[serde(default)]
    pub global_work_size: [u32; 3],
    #[serde(default)]
    pub local_work_size: [u32; 3],
}

impl KernelTrace {
    pub fn duration(&self) -> DurationMs {
        self.end - self.start
    }

    /// Total number of work items in the global range
    pub fn work_items(&self) -> u64 {
        self.global_work_size.iter().map(|&d| d as u64).product()
    }
}

/// One host buffer read or write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferTrace {
    /// Runtime address of the buffer event
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub context_id: u32,
    #[serde(default)]
    pub command_queue_id: u32,
    pub size: u64,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl BufferTrace {
    pub fn duration(&self) -> DurationMs {
        self.end - self.start
    }

    /// Observed transfer rate in MB/s (0 for an instantaneous transfer)
    pub fn transfer_rate_mbps(&self) -> f64 {
        let duration = self.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        self.size as f64 / (1000.0 * duration)
    }
}

/// One transfer observed by the device monitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTrace {
    pub device_name: String,
    /// Monitor slot name, e.g. a compute-unit port or the host interface
    pub name: String,
    /// Arguments or memory resource served by the slot
    #[serde(default)]
    pub content: String,
    pub start: Timestamp,
    pub end: Timestamp,
    #[serde(default)]
    pub burst_length: u32,
    #[serde(default)]
    pub num_bytes: u64,
}

impl DeviceTrace {
    pub fn duration(&self) -> DurationMs {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_trace_duration() {
        let trace = KernelTrace {
            address: 0x1000,
            kernel_name: "vadd".to_string(),
            device_name: "dev0".to_string(),
            context_id: 0,
            command_queue_id: 0,
            start: 10.0,
            end: 14.5,
            global_work_size: [1024, 2, 1],
            local_work_size: [16, 1, 1],
        };
        assert_eq!(trace.duration(), 4.5);
        assert_eq!(trace.work_items(), 2048);
    }

    #[test]
    fn test_buffer_trace_rate() {
        let trace = BufferTrace {
            address: 0,
            context_id: 0,
            command_queue_id: 0,
            size: 4_000_000,
            start: 0.0,
            end: 2.0,
        };
        // 4 MB in 2 ms
        assert!((trace.transfer_rate_mbps() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_buffer_trace_zero_duration_rate() {
        let trace = BufferTrace {
            address: 0,
            context_id: 0,
            command_queue_id: 0,
            size: 1024,
            start: 5.0,
            end: 5.0,
        };
        assert_eq!(trace.transfer_rate_mbps(), 0.0);
    }

    #[test]
    fn test_device_trace_defaults() {
        let json = r#"{"device_name":"dev0","name":"vadd_1/m_axi_gmem","start":1.0,"end":3.0}"#;
        let trace: DeviceTrace = serde_json::from_str(json).unwrap();
        assert_eq!(trace.duration(), 2.0);
        assert_eq!(trace.num_bytes, 0);
        assert!(trace.content.is_empty());
    }
}
