//! Call/execution time statistics for one named activity

use accelprof_shared::types::events::{DurationMs, Timestamp};
use serde::Serialize;

/// Accumulated timing of one activity (API call, kernel, compute unit).
///
/// Intervals are paired start/end; only a closed interval is counted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeStats {
    count: u64,
    total_time: DurationMs,
    min_time: DurationMs,
    max_time: DurationMs,
    clock_freq_mhz: u32,

    #[serde(skip)]
    open_start: Option<Timestamp>,
}

impl TimeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an interval. A second start before the end replaces the first.
    pub fn log_start(&mut self, timestamp: Timestamp) {
        self.open_start = Some(timestamp);
    }

    /// Close the open interval and fold its duration into the statistics.
    ///
    /// Returns false, leaving the statistics untouched, when no interval is open.
    pub fn log_end(&mut self, timestamp: Timestamp) -> bool {
        let Some(start) = self.open_start.take() else {
            return false;
        };

        let duration = timestamp - start;
        if self.count == 0 {
            self.min_time = duration;
            self.max_time = duration;
        } else {
            self.min_time = self.min_time.min(duration);
            self.max_time = self.max_time.max(duration);
        }
        self.count += 1;
        self.total_time += duration;
        true
    }

    /// Replace the statistics with values aggregated by the device itself.
    pub fn log_stats(
        &mut self,
        total_time: DurationMs,
        max_time: DurationMs,
        min_time: DurationMs,
        calls: u32,
        clock_freq_mhz: u32,
    ) {
        self.total_time = total_time;
        self.max_time = max_time;
        self.min_time = min_time;
        self.count = calls as u64;
        self.clock_freq_mhz = clock_freq_mhz;
    }

    pub fn total_time(&self) -> DurationMs {
        self.total_time
    }

    pub fn calls(&self) -> u64 {
        self.count
    }

    pub fn min_time(&self) -> DurationMs {
        self.min_time
    }

    pub fn max_time(&self) -> DurationMs {
        self.max_time
    }

    pub fn average_time(&self) -> DurationMs {
        if self.count == 0 {
            0.0
        } else {
            self.total_time / self.count as f64
        }
    }

    /// Clock the device reported its statistics at (0 for host-timed activity)
    pub fn clock_freq_mhz(&self) -> u32 {
        self.clock_freq_mhz
    }

    /// True while a start is waiting for its end
    pub fn is_open(&self) -> bool {
        self.open_start.is_some()
    }
}
