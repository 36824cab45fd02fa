mod config;
mod data;
mod error;
mod report;
mod stats;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;

use config::Layout;
use data::loader::{load_file, InputFormat};
use data::model::ChannelSpec;
use report::{analyse, Report};
use stats::AnomalyPolicy;

#[derive(Parser, Debug)]
#[command(name = "latency-panda")]
#[command(about = "Latency statistics for echo benchmark timestamp tables")]
struct Cli {
    /// Benchmark tables to analyse (`-` reads stdin)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Built-in column layout
    #[arg(short, long, value_enum, default_value_t = Layout::RoundTrip)]
    layout: Layout,

    /// JSON layout file with explicit channel definitions (replaces --layout)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Channel as NAME=CAUSE:EFFECT[@ID] or NAME=:EFFECT (repeatable, replaces --layout/--config)
    #[arg(long = "channel", value_name = "SPEC")]
    channels: Vec<ChannelSpec>,

    /// Whether negative samples take part in the statistics
    #[arg(long, value_enum, default_value_t = AnomalyPolicy::Include)]
    anomalies: AnomalyPolicy,

    /// Prefix each summary row with its channel name
    #[arg(long)]
    labels: bool,

    /// Report format; `json` always emits an array with one object per input
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Input format (default: by file extension)
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    input_format: InputFormat,

    /// More logging on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct SourcedReport<'a> {
    source: String,
    #[serde(flatten)]
    report: &'a Report,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Analyse every input, then write the reports.  Nothing reaches `out`
/// unless all inputs loaded and analysed cleanly.
fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let specs = config::resolve_channels(cli.layout, cli.config.as_deref(), &cli.channels)?;

    let mut reports = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let table = load_file(path, cli.input_format)
            .with_context(|| format!("loading {}", path.display()))?;
        let report = analyse(&table, &specs, cli.anomalies)
            .with_context(|| format!("analysing {}", path.display()))?;
        reports.push((path.clone(), report));
    }

    write_reports(out, &reports, cli.format, cli.labels)
}

/// Text: one report per input, each headed by `==> path <==` when there are
/// several.  JSON: always an array with one object per input.
fn write_reports<W: Write>(
    out: &mut W,
    reports: &[(PathBuf, Report)],
    format: OutputFormat,
    labels: bool,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let many = reports.len() > 1;
            for (i, (path, report)) in reports.iter().enumerate() {
                if many {
                    if i > 0 {
                        writeln!(out)?;
                    }
                    writeln!(out, "==> {} <==", path.display())?;
                }
                write!(out, "{}", report.render_text(labels))?;
            }
        }
        OutputFormat::Json => {
            let sourced: Vec<SourcedReport> = reports
                .iter()
                .map(|(path, report)| SourcedReport {
                    source: path.display().to_string(),
                    report,
                })
                .collect();
            serde_json::to_writer_pretty(&mut *out, &sourced)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
