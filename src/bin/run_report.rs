//! run-report
//!
//! Feeds a JSON-lines stream of run lifecycle events to an [`Aggregator`]
//! and prints the resulting report as JSON on stdout.

use anyhow::{Context, bail};
use clap::Parser;
use e2e_kit::metrics::Phase;
use e2e_kit::{Aggregator, ReportWriter, RunEvent, RunReport};
use std::fs::File;
use std::io::{BufRead, BufReader, Write, stdin, stdout};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "run-report")]
#[command(version)]
#[command(about = "Aggregate test-run lifecycle events into a metrics report", long_about = None)]
struct Cli {
    /// JSON-lines event file, or `-` for stdin
    #[arg(value_name = "FILE", default_value = "-")]
    input: String,

    /// Also write the report to a timestamped file in this directory
    #[arg(long, short = 'o', value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,

    /// Print the report JSON schema and exit
    #[arg(long)]
    schema: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.schema {
        println!("{}", serde_json::to_string_pretty(&RunReport::json_schema())?);
        return Ok(());
    }

    let reader: Box<dyn BufRead> = if cli.input == "-" {
        Box::new(BufReader::new(stdin()))
    } else {
        let file = File::open(&cli.input).with_context(|| format!("Failed to open {}", cli.input))?;
        Box::new(BufReader::new(file))
    };

    let report = aggregate(reader)?;

    if let Some(dir) = &cli.out_dir {
        ReportWriter::new(dir).write(&report)?;
    }

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    let mut out = stdout().lock();
    writeln!(out, "{}", json)?;
    Ok(())
}

fn aggregate(reader: impl BufRead) -> anyhow::Result<RunReport> {
    let mut aggregator = Aggregator::new();
    let mut report = None;

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", number))?;
        if line.trim().is_empty() {
            continue;
        }

        if report.is_some() {
            bail!("line {}: event after run_end", number);
        }

        let event = RunEvent::from_json(&line).with_context(|| format!("line {}: invalid event", number))?;
        report = aggregator
            .apply(event)
            .with_context(|| format!("line {}: lifecycle error", number))?;
    }

    match report {
        Some(report) => Ok(report),
        None if aggregator.phase() == Phase::Running => {
            log::warn!("Stream ended without run_end; finalizing");
            Ok(aggregator.on_run_end()?)
        }
        None => bail!("No run_start event in input"),
    }
}
