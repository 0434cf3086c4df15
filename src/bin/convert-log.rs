//! CLI tool to convert a test-execution log into JSON Lines.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use testlog_pipelines::{LogRecord, gather_records};

/// Frame a log into records and print each record as one JSON object.
///
/// Records that do not parse are reported on stderr and skipped.
#[derive(Parser)]
#[command(name = "convert-log")]
struct Cli {
    /// Log file to read (default: stdin)
    input: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show record counts on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let input: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("reading input file '{}'", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let output: Box<dyn Write> = match &cli.output {
        Some(path) => {
            create_parent_dir(path)?;
            Box::new(
                File::create(path)
                    .with_context(|| format!("writing output file '{}'", path.display()))?,
            )
        }
        None => Box::new(io::stdout().lock()),
    };
    let mut output = BufWriter::new(output);

    let mut read_error = None;
    let lines = input.lines().map_while(|line| match line {
        Ok(line) => Some(line),
        Err(e) => {
            read_error = Some(e);
            None
        }
    });

    let mut converted = 0usize;
    let mut rejected = 0usize;
    for (index, record_lines) in gather_records(lines).enumerate() {
        match LogRecord::from_lines(&record_lines) {
            Ok(record) => {
                serde_json::to_writer(&mut output, &record)?;
                writeln!(output)?;
                converted += 1;
            }
            Err(e) => {
                eprintln!("record {}: {e}", index + 1);
                rejected += 1;
            }
        }
    }
    if let Some(e) = read_error {
        return Err(e).context("reading log lines");
    }
    output.flush().context("flushing output")?;

    if cli.verbose {
        eprintln!("Records:  {converted} converted, {rejected} rejected");
    }
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory for '{}'", path.display()))?;
    }
    Ok(())
}
