//! Insight Topology - external resource analysis for recorded traces
//!
//! Reads traces as JSON Lines and reports the remote endpoints each one
//! called.

use clap::{Parser, Subcommand, ValueEnum};
use insight_core::config::{AnalyzerConfig, ConfigLoader};
use insight_core::trace::Trace;
use insight_topology::{
    ExternalResourceAnalyzer, ExternalResourceDescriptor, HttpExternalResourceAnalyzer,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "insight-topology")]
#[command(version)]
#[command(about = "Locate external HTTP resources in recorded traces", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "INSIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze recorded traces
    Analyze {
        /// Input file (JSONL, one trace per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective configuration
    Config {
        /// Write the configuration to this path instead of printing it
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Analysis result for one trace
#[derive(Debug, Serialize)]
struct TraceReport {
    trace_id: String,
    resources: Vec<ExternalResourceDescriptor>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.clone());

    // CLI verbose flag takes precedence over config
    let log_level = if cli.verbose > 0 {
        match cli.verbose {
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    } else {
        parse_level(&config.logging.log_level)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Analyze { input, format } => analyze_command(&config, &input, format),
        Commands::Config { write } => config_command(&config, write),
    }
}

/// Load configuration from file/env, with fallback to defaults
fn load_config(cli_path: Option<PathBuf>) -> AnalyzerConfig {
    let loader = ConfigLoader::new().with_cli_path(cli_path);
    match loader.load() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet
            eprintln!("Failed to load configuration: {}, using defaults", e);
            AnalyzerConfig::default()
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

fn analyze_command(
    config: &AnalyzerConfig,
    input: &PathBuf,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let file = File::open(input)?;
    let traces = read_traces(BufReader::new(file))?;
    info!("Loaded {} traces from {}", traces.len(), input.display());

    let analyzer = HttpExternalResourceAnalyzer::from_config(config);
    for trace in &traces {
        let report = analyze_trace(&analyzer, trace);
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
            OutputFormat::Text => print_report(&report),
        }
    }

    Ok(())
}

fn config_command(config: &AnalyzerConfig, write: Option<PathBuf>) -> anyhow::Result<()> {
    match write {
        Some(path) => ConfigLoader::save(config, &path)?,
        None => print!("{}", ConfigLoader::to_toml(config)?),
    }
    Ok(())
}

/// Parse one trace per non-empty line, skipping lines that are not traces
fn read_traces<R: BufRead>(reader: R) -> anyhow::Result<Vec<Trace>> {
    let mut traces = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Trace>(&line) {
            Ok(trace) => traces.push(trace),
            Err(e) => warn!("Skipping line {}: {}", idx + 1, e),
        }
    }
    Ok(traces)
}

fn analyze_trace(analyzer: &dyn ExternalResourceAnalyzer, trace: &Trace) -> TraceReport {
    let mut resources: Vec<ExternalResourceDescriptor> =
        analyzer.locate_in_trace(trace).into_iter().collect();
    resources.sort_by(|a, b| (&a.label, a.port).cmp(&(&b.label, b.port)));

    TraceReport {
        trace_id: trace.trace_id.clone(),
        resources,
    }
}

fn print_report(report: &TraceReport) {
    println!("\n=== Trace {} ===\n", report.trace_id);
    if report.resources.is_empty() {
        println!("  (no external resources)");
        return;
    }

    for r in &report.resources {
        println!(
            "  {:<30} {:<25} {:>5}  {}",
            r.label,
            r.host,
            r.port,
            r.resource_type
        );
        let tokens = [("app", &r.app), ("server", &r.server), ("endpoint", &r.endpoint)];
        for (key, value) in tokens {
            if let Some(value) = value {
                println!("      {:<10} {}", key, value);
            }
        }
    }
}
