//! JSON output
//!
//! Exports the collected summary rows for further analysis

use accelprof_aggregator::SummaryRow;
use anyhow::{Context, Result};
use std::io::Write;

/// Serialize rows as one pretty-printed JSON array
pub fn write_json<W: Write>(rows: &[SummaryRow], writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, rows).context("Failed to serialize summary to JSON")
}
