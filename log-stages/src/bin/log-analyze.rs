//! CLI tool to run a YAML-configured analysis pipeline over a log.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log_stages::builtin_registry;
use testlog_pipelines::{Pipeline, PipelineConfiguration};
use tracing::{info, warn};

/// Run the stages of a pipeline configuration over every record of a log.
///
/// Stage output goes to stdout; diagnostics go to stderr.
#[derive(Parser)]
#[command(name = "log-analyze")]
struct Cli {
    /// Pipeline configuration (.yml)
    #[arg(required_unless_present = "list_stages")]
    pipeline: Option<PathBuf>,

    /// Log file to read (default: stdin)
    input: Option<PathBuf>,

    /// Skip records that fail instead of stopping at the first one
    #[arg(short, long)]
    keep_going: bool,

    /// List the built-in stage handles and exit
    #[arg(long)]
    list_stages: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = builtin_registry();
    if cli.list_stages {
        for handle in registry.handles() {
            println!("{handle}");
        }
        return Ok(());
    }

    let Some(config_path) = &cli.pipeline else {
        anyhow::bail!("no pipeline configuration given");
    };
    let config = PipelineConfiguration::from_path(config_path)?;
    let pipeline = Pipeline::new(&config, &registry)
        .with_context(|| format!("building pipeline from '{}'", config_path.display()))?;

    let input: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("reading input file '{}'", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut read_error = None;
    let lines = input.lines().map_while(|line| match line {
        Ok(line) => Some(line),
        Err(e) => {
            read_error = Some(e);
            None
        }
    });

    let mut processed = 0usize;
    let mut failed = 0usize;
    for (index, item) in pipeline.process_lines(lines).enumerate() {
        match item {
            Ok(_) => processed += 1,
            Err(e) if cli.keep_going => {
                warn!(record = index + 1, error = %e, "skipping record");
                failed += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("record {}", index + 1)),
        }
    }
    if let Some(e) = read_error {
        return Err(e).context("reading log lines");
    }

    info!(processed, failed, "finished");
    Ok(())
}
