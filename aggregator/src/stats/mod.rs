//! Running accumulators for timed activities and data transfers

pub mod buffer;
pub mod time;

pub use buffer::BufferStats;
pub use time::TimeStats;
