//! Performance counter aggregation
//!
//! Turns the raw event stream of an accelerator profiling session into
//! summary statistics: per-call and per-kernel timing, compute-unit
//! execution, buffer transfer volumes and bounded lists of the longest
//! traces. Results are emitted through the [`writer::SummaryWriter`] trait.

pub mod config;
pub mod counter;
pub mod metrics;
pub mod registry;
pub mod report;
pub mod stats;
pub mod top_usage;
pub mod writer;

pub use config::{ConfigError, CounterConfig};
pub use counter::{ComputeUnitTime, PerformanceCounter, KERNEL_TRANSFER_BUCKET};
pub use registry::{ComputeUnitRegistry, Reconciliation};
pub use report::{CollectingWriter, SummaryRow};
pub use stats::{BufferStats, TimeStats};
pub use top_usage::{Trace, TopUsage};
pub use writer::SummaryWriter;
