//! Data transfer statistics

use accelprof_shared::types::events::DurationMs;
use serde::Serialize;

/// Accumulated data-transfer activity plus the link it went over.
///
/// Link attributes (bit width, clock, context, device count) describe the
/// accumulator as a whole and may be set after samples were logged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BufferStats {
    count: u64,
    total_bytes: u64,
    total_time: DurationMs,
    bit_width: u32,
    clock_freq_mhz: f64,
    context_id: u32,
    num_devices: u32,
}

impl BufferStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one transfer into the totals
    pub fn log(&mut self, size: u64, duration: DurationMs) {
        self.count += 1;
        self.total_bytes = self.total_bytes.saturating_add(size);
        self.total_time += duration;
    }

    /// Fold one transfer and record the link it was observed on
    pub fn log_with_link(
        &mut self,
        size: u64,
        duration: DurationMs,
        bit_width: u32,
        clock_freq_mhz: f64,
    ) {
        self.log(size, duration);
        self.bit_width = bit_width;
        self.clock_freq_mhz = clock_freq_mhz;
    }

    pub fn set_bit_width(&mut self, bit_width: u32) {
        self.bit_width = bit_width;
    }

    pub fn set_clock_freq_mhz(&mut self, clock_freq_mhz: f64) {
        self.clock_freq_mhz = clock_freq_mhz;
    }

    pub fn set_context_id(&mut self, context_id: u32) {
        self.context_id = context_id;
    }

    pub fn set_num_devices(&mut self, num_devices: u32) {
        self.num_devices = num_devices;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn total_time(&self) -> DurationMs {
        self.total_time
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub fn clock_freq_mhz(&self) -> f64 {
        self.clock_freq_mhz
    }

    pub fn context_id(&self) -> u32 {
        self.context_id
    }

    pub fn num_devices(&self) -> u32 {
        self.num_devices
    }

    pub fn average_size(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_bytes as f64 / self.count as f64
        }
    }

    pub fn average_time(&self) -> DurationMs {
        if self.count == 0 {
            0.0
        } else {
            self.total_time / self.count as f64
        }
    }

    /// Shortest time the logged bytes could have taken at `max_rate_mbps`.
    pub fn min_transfer_time_ms(&self, max_rate_mbps: f64) -> DurationMs {
        if max_rate_mbps.is_nan() || max_rate_mbps <= 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / (1000.0 * max_rate_mbps)
    }

    /// Observed time, floored by what the link could physically achieve.
    ///
    /// Wall-clock time can undercount when transfers overlap; the link rate
    /// bounds how fast the bytes could really have moved.
    pub fn effective_time_ms(&self, max_rate_mbps: f64) -> DurationMs {
        self.total_time.max(self.min_transfer_time_ms(max_rate_mbps))
    }

    /// Throughput in MB/s over the effective time
    pub fn throughput_mbps(&self, max_rate_mbps: f64) -> f64 {
        let time_ms = self.effective_time_ms(max_rate_mbps);
        if time_ms <= 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / (1000.0 * time_ms)
    }

    /// Peak rate of the link in MB/s: bytes per beat times beats per microsecond
    pub fn max_link_rate_mbps(&self) -> f64 {
        (self.bit_width as f64 / 8.0) * self.clock_freq_mhz
    }
}
