//! Event type definitions for counter ingestion
//!
//! These types represent the discrete events emitted by the device/transport
//! layer and consumed by the performance counter.

use serde::{Deserialize, Serialize};

use super::key::ComputeUnitKey;
use super::trace::{BufferTrace, DeviceTrace, KernelTrace};

/// Timestamp in milliseconds, in whatever epoch the producer uses
pub type Timestamp = f64;

/// Duration in milliseconds
pub type DurationMs = f64;

/// Direction of a data transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Read,
    Write,
}

impl TransferDirection {
    pub fn from_is_read(is_read: bool) -> Self {
        if is_read {
            TransferDirection::Read
        } else {
            TransferDirection::Write
        }
    }

    pub fn is_read(self) -> bool {
        matches!(self, TransferDirection::Read)
    }

    /// Label used in summary rows
    pub fn as_str(self) -> &'static str {
        match self {
            TransferDirection::Read => "READ",
            TransferDirection::Write => "WRITE",
        }
    }
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic device-side transfer record, routed by its flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub device_name: String,
    pub kernel_name: String,
    pub size: u64,
    pub duration: DurationMs,
    #[serde(default)]
    pub bit_width: u32,
    #[serde(default)]
    pub clock_freq_mhz: f64,
    #[serde(default)]
    pub is_kernel: bool,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_kernel_transfer: bool,
}

/// Unified counter event type, one variant per ingestion operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CounterEvent {
    BufferTransfer {
        direction: TransferDirection,
        size: u64,
        duration: DurationMs,
        #[serde(default)]
        context_id: u32,
        #[serde(default = "one_device")]
        num_devices: u32,
    },
    Device(DeviceEvent),
    FunctionCallStart {
        name: String,
        timestamp: Timestamp,
    },
    FunctionCallEnd {
        name: String,
        timestamp: Timestamp,
    },
    KernelExecutionStart {
        kernel_name: String,
        device_name: String,
        timestamp: Timestamp,
    },
    KernelExecutionEnd {
        kernel_name: String,
        device_name: String,
        timestamp: Timestamp,
    },
    ComputeUnitExecutionStart {
        #[serde(flatten)]
        key: ComputeUnitKey,
        timestamp: Timestamp,
    },
    ComputeUnitExecutionEnd {
        #[serde(flatten)]
        key: ComputeUnitKey,
        timestamp: Timestamp,
    },
    ComputeUnitDeviceStart {
        device_name: String,
        timestamp: Timestamp,
    },
    ComputeUnitStats {
        cu_name: String,
        kernel_name: String,
        total_time: DurationMs,
        max_time: DurationMs,
        min_time: DurationMs,
        calls: u32,
        clock_freq_mhz: u32,
    },
    KernelTrace(KernelTrace),
    BufferTrace {
        direction: TransferDirection,
        #[serde(flatten)]
        trace: BufferTrace,
    },
    DeviceTrace {
        direction: TransferDirection,
        #[serde(default)]
        is_kernel: bool,
        #[serde(flatten)]
        trace: DeviceTrace,
    },
}

fn one_device() -> u32 {
    1
}

impl CounterEvent {
    /// Short kind label, used for logging and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CounterEvent::BufferTransfer { .. } => "buffer_transfer",
            CounterEvent::Device(_) => "device",
            CounterEvent::FunctionCallStart { .. } | CounterEvent::FunctionCallEnd { .. } => {
                "function_call"
            }
            CounterEvent::KernelExecutionStart { .. } | CounterEvent::KernelExecutionEnd { .. } => {
                "kernel_execution"
            }
            CounterEvent::ComputeUnitExecutionStart { .. }
            | CounterEvent::ComputeUnitExecutionEnd { .. }
            | CounterEvent::ComputeUnitDeviceStart { .. } => "compute_unit_execution",
            CounterEvent::ComputeUnitStats { .. } => "compute_unit_stats",
            CounterEvent::KernelTrace(_) => "kernel_trace",
            CounterEvent::BufferTrace { .. } => "buffer_trace",
            CounterEvent::DeviceTrace { .. } => "device_trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_labels() {
        assert_eq!(TransferDirection::Read.to_string(), "READ");
        assert_eq!(TransferDirection::Write.to_string(), "WRITE");
        assert_eq!(TransferDirection::from_is_read(true), TransferDirection::Read);
        assert!(!TransferDirection::from_is_read(false).is_read());
    }

    #[test]
    fn test_buffer_transfer_defaults() {
        let json = r#"{"event":"buffer_transfer","direction":"read","size":4096,"duration":0.5}"#;
        let event: CounterEvent = serde_json::from_str(json).unwrap();
        match event {
            CounterEvent::BufferTransfer {
                direction,
                size,
                context_id,
                num_devices,
                ..
            } => {
                assert_eq!(direction, TransferDirection::Read);
                assert_eq!(size, 4096);
                assert_eq!(context_id, 0);
                assert_eq!(num_devices, 1);
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_compute_unit_event_flattened_key() {
        let json = r#"{
            "event": "compute_unit_execution_start",
            "device_name": "dev0",
            "kernel_name": "vadd",
            "global_size": "1024:1:1",
            "local_size": "16:1:1",
            "object_id": 7,
            "timestamp": 12.5
        }"#;
        let event: CounterEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), "compute_unit_execution");
        match event {
            CounterEvent::ComputeUnitExecutionStart { key, timestamp } => {
                assert_eq!(key.kernel_name, "vadd");
                assert_eq!(key.cu_name, None);
                assert_eq!(key.object_id, 7);
                assert_eq!(timestamp, 12.5);
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_device_event_flags_default_false() {
        let json = r#"{"event":"device","device_name":"dev0","kernel_name":"k","size":64,"duration":0.1}"#;
        let event: CounterEvent = serde_json::from_str(json).unwrap();
        match event {
            CounterEvent::Device(ev) => {
                assert!(!ev.is_kernel);
                assert!(!ev.is_read);
                assert!(!ev.is_kernel_transfer);
                assert_eq!(ev.bit_width, 0);
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }
}
