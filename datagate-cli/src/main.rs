//! datagate CLI: pre-training data gate.
//!
//! Validates a train/test pair against a schema, quarantines non-conforming
//! data and reports distribution drift between the two.

mod commands;

use chrono::Local;
use clap::Parser;
use datagate_core::artifact::TIMESTAMP_FORMAT;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// datagate: certify training data before it reaches a model
#[derive(Parser, Debug)]
#[command(name = "datagate", version, about, long_about = None)]
struct Cli {
    /// Workspace directory; relative paths in the configuration resolve against it
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate a train/test pair, route it, and check it for drift
    Validate {
        /// Training split (CSV)
        #[arg(long, requires = "test", conflicts_with = "ingestion")]
        train: Option<PathBuf>,

        /// Test split (CSV)
        #[arg(long, requires = "train", conflicts_with = "ingestion")]
        test: Option<PathBuf>,

        /// Ingestion artifact (JSON with trained_file_path and test_file_path)
        #[arg(long, required_unless_present = "train")]
        ingestion: Option<PathBuf>,

        /// Schema file (overrides schema_path from the configuration)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Artifact root (overrides artifact_dir from the configuration)
        #[arg(long)]
        artifact_dir: Option<PathBuf>,
    },
    /// Compare two datasets for distribution drift
    Drift {
        /// Reference dataset (CSV)
        #[arg(long)]
        baseline: PathBuf,

        /// Dataset compared against the baseline (CSV)
        #[arg(long)]
        candidate: PathBuf,

        /// Schema whose declared types pick each column's test
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Significance level (defaults to drift.threshold)
        #[arg(long)]
        threshold: Option<f64>,

        /// Write the report as YAML to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Load a schema file and summarize it
    Schema {
        /// Schema file (YAML)
        path: PathBuf,
    },
    /// Print the resolved configuration as JSON
    Config,
}

fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let started_at = Local::now();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let config = datagate_core::load_config(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // One JSON log file per run, named after the start time
    let log_dir = workspace.join(&config.log_dir);
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file = format!("{}.log", started_at.format(TIMESTAMP_FORMAT));
    let file_appender = tracing_appender::rolling::never(&log_dir, log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let ctx = commands::Context {
        workspace,
        config,
        started_at,
    };
    commands::handle_command(cli.command, &ctx)
}
