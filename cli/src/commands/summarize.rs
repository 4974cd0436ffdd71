//! Summarize command implementation
//!
//! Replays a JSON-lines event recording through a fresh performance counter
//! and prints the session summary.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use accelprof_aggregator::{
    metrics, CollectingWriter, CounterConfig, PerformanceCounter, SummaryWriter,
};
use accelprof_shared::{CounterEvent, TransferDirection};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use crate::output::{self, json, table::TableWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Event recording, one JSON event per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Counter configuration file (TOML, JSON or YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: Format,

    /// Write the summary to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Peak host transfer rate in MB/s, overrides the configuration
    #[arg(long)]
    pub max_rate: Option<f64>,

    /// Print counter metrics in Prometheus text format to stderr
    #[arg(long)]
    pub metrics: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run(args: SummarizeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => CounterConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => CounterConfig::default(),
    };
    if let Some(rate) = args.max_rate {
        config.max_host_transfer_rate_mbps = rate;
    }
    config.validate()?;

    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open input: {}", args.input.display()))?;
    let mut counter = PerformanceCounter::new(config);
    let events = replay(BufReader::new(file), &mut counter)
        .with_context(|| format!("Failed to replay {}", args.input.display()))?;

    info!("Replayed {} events from {}", events, args.input.display());
    if events == 0 {
        output::warning("No events found in input");
    }

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            render(&counter, args.format, BufWriter::new(file))?;
            output::success(&format!("Summary written to {}", path.display()));
        }
        None => render(&counter, args.format, io::stdout().lock())?,
    }

    if args.metrics {
        eprint!("{}", metrics::encode_metrics());
    }

    Ok(())
}

/// Apply every event in `reader` to `counter`, returning how many were applied.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn replay<R: BufRead>(reader: R, counter: &mut PerformanceCounter) -> Result<usize> {
    let mut applied = 0;
    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_number))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let event: CounterEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid event on line {}", line_number))?;
        counter.apply(event);
        applied += 1;
    }
    Ok(applied)
}

fn render<W: Write>(counter: &PerformanceCounter, format: Format, out: W) -> Result<()> {
    let max_rate = counter.config().max_host_transfer_rate_mbps;
    match format {
        Format::Table => {
            let mut writer = TableWriter::new(out);
            write_report(counter, &mut writer, max_rate)?;
            writer.finish()?;
        }
        Format::Json => {
            let mut collector = CollectingWriter::new();
            write_report(counter, &mut collector, max_rate)?;
            json::write_json(collector.rows(), out)?;
        }
    }
    Ok(())
}

/// Emit every report section in a fixed order
pub fn write_report(
    counter: &PerformanceCounter,
    writer: &mut dyn SummaryWriter,
    max_rate_mbps: f64,
) -> Result<()> {
    writer.begin_section("API Calls")?;
    counter.write_api_summary(writer)?;

    writer.begin_section("Kernel Executions")?;
    counter.write_kernel_summary(writer)?;

    writer.begin_section("Compute Units")?;
    counter.write_compute_unit_summary(writer)?;

    writer.begin_section("Top Kernels")?;
    counter.write_top_kernel_summary(writer)?;

    writer.begin_section("Host Transfers")?;
    for direction in [TransferDirection::Read, TransferDirection::Write] {
        counter.write_host_transfer_summary(writer, direction, max_rate_mbps)?;
    }

    writer.begin_section("Device Transfers")?;
    for direction in [TransferDirection::Read, TransferDirection::Write] {
        counter.write_device_transfer_summary(writer, direction)?;
    }

    for direction in [TransferDirection::Read, TransferDirection::Write] {
        writer.begin_section(&format!("Top Host {} Transfers", title_case(direction)))?;
        counter.write_top_data_transfer_summary(writer, direction)?;
    }

    for direction in [TransferDirection::Read, TransferDirection::Write] {
        writer.begin_section(&format!("Top Device {} Transfers", title_case(direction)))?;
        counter.write_top_device_transfer_summary(writer, direction)?;
    }

    for direction in [TransferDirection::Read, TransferDirection::Write] {
        writer.begin_section(&format!("Top Kernel Port {} Transfers", title_case(direction)))?;
        counter.write_top_kernel_transfer_trace_summary(writer, direction)?;
    }

    Ok(())
}

fn title_case(direction: TransferDirection) -> &'static str {
    match direction {
        TransferDirection::Read => "Read",
        TransferDirection::Write => "Write",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accelprof_aggregator::SummaryRow;
    use std::io::Cursor;

    fn counter() -> PerformanceCounter {
        PerformanceCounter::new(CounterConfig {
            top_kernel_limit: 10,
            top_transfer_limit: 10,
            per_context_buffer_stats: false,
            max_host_transfer_rate_mbps: 8000.0,
        })
    }

    const RECORDING: &str = r#"
# recorded session
{"event":"function_call_start","name":"clFinish","timestamp":0.0}
{"event":"function_call_end","name":"clFinish","timestamp":5.0}

{"event":"kernel_execution_start","kernel_name":"vadd","device_name":"dev0","timestamp":1.0}
{"event":"kernel_execution_end","kernel_name":"vadd","device_name":"dev0","timestamp":4.0}
{"event":"buffer_transfer","direction":"write","size":1024,"duration":0.5}
{"event":"device","device_name":"dev0","kernel_name":"vadd","size":256,"duration":0.1,"is_read":true}
"#;

    #[test]
    fn test_replay_skips_comments_and_blanks() {
        let mut counter = counter();
        let applied = replay(Cursor::new(RECORDING), &mut counter).unwrap();

        assert_eq!(applied, 6);
        assert_eq!(counter.function_calls()["clFinish"].total_time(), 5.0);
        assert_eq!(counter.total_kernel_execution_time("dev0"), 3.0);
        assert_eq!(
            counter
                .device_transfer_stats(TransferDirection::Read)
                .total_bytes(),
            256
        );
    }

    #[test]
    fn test_replay_reports_line_number() {
        let input = "{\"event\":\"function_call_start\",\"name\":\"a\",\"timestamp\":0.0}\n\nnot json\n";
        let mut counter = counter();
        let err = replay(Cursor::new(input), &mut counter).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[test]
    fn test_replay_rejects_unknown_event() {
        let mut counter = counter();
        let result = replay(Cursor::new(r#"{"event":"teleport","timestamp":1.0}"#), &mut counter);
        assert!(result.is_err());
    }

    #[test]
    fn test_report_sections_in_order() {
        let mut counter = counter();
        replay(Cursor::new(RECORDING), &mut counter).unwrap();

        let mut out = Vec::new();
        render(&counter, Format::Table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let api = text.find("API Calls").unwrap();
        let kernels = text.find("Kernel Executions").unwrap();
        let host = text.find("Host Transfers").unwrap();
        let device = text.find("Device Transfers").unwrap();
        assert!(api < kernels && kernels < host && host < device);
        assert!(text.contains("clFinish"));
        assert!(text.contains("DEVICE READ BUFFER"));
    }

    #[test]
    fn test_json_report_rows() {
        let mut counter = counter();
        replay(Cursor::new(RECORDING), &mut counter).unwrap();

        let mut collector = CollectingWriter::new();
        write_report(&counter, &mut collector, 8000.0).unwrap();

        assert_eq!(collector.call_names(), vec!["clFinish", "vadd"]);
        let buffers = collector
            .rows()
            .iter()
            .filter(|row| matches!(row, SummaryRow::Buffer { .. }))
            .count();
        assert_eq!(buffers, 2);
        let host = collector
            .rows()
            .iter()
            .filter(|row| matches!(row, SummaryRow::HostTransfer(_)))
            .count();
        assert_eq!(host, 1);
    }

    #[test]
    fn test_run_writes_output_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("events.jsonl");
        let output = temp_dir.path().join("summary.json");
        std::fs::write(&input, RECORDING).unwrap();

        run(SummarizeArgs {
            input,
            config: None,
            format: Format::Json,
            output: Some(output.clone()),
            max_rate: Some(4000.0),
            metrics: false,
            verbose: false,
        })
        .unwrap();

        let contents = std::fs::read_to_string(output).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let host = rows
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["row"] == "host_transfer")
            .unwrap();
        assert_eq!(host["max_rate_mbps"], 4000.0);
    }

    #[test]
    fn test_run_rejects_bad_rate() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("events.jsonl");
        std::fs::write(&input, RECORDING).unwrap();

        let result = run(SummarizeArgs {
            input,
            config: None,
            format: Format::Table,
            output: None,
            max_rate: Some(0.0),
            metrics: false,
            verbose: false,
        });
        assert!(result.is_err());
    }
}
