//! `varsolve` — resolve `NAME=expression` assignments and print the values.
//!
//! Input is a line count followed by that many assignment lines, read from
//! a file or stdin. Output is one `NAME = value` line per variable, sorted
//! by name.

mod input;

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use varsolve_core::variables::Resolution;
use varsolve_core::{resolve_with, ResolveOptions};

#[derive(Parser)]
#[command(version, about = "Resolve named arithmetic assignments")]
struct Cli {
    /// Input file (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Fail on the first assignment that cannot be evaluated instead of
    /// retrying it until no progress is made
    #[arg(long)]
    strict: bool,

    /// Print the resolution as JSON
    #[arg(long)]
    json: bool,

    /// Log resolution passes to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_source(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("cannot read stdin")?;
            Ok(text)
        }
    }
}

fn write_resolution(out: &mut impl Write, resolution: &Resolution, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, resolution)?;
        writeln!(out)?;
    } else {
        for variable in &resolution.variables {
            writeln!(out, "{variable}")?;
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let text = read_source(cli.file.as_ref())?;
    let lines = input::read_assignments(&text)?;
    debug!(count = lines.len(), "read assignments");

    let options = ResolveOptions { strict: cli.strict };
    let resolution = resolve_with(&lines, options).context("resolution failed")?;
    info!(
        variables = resolution.variables.len(),
        passes = resolution.passes,
        "resolved"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_resolution(&mut out, &resolution, cli.json)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
