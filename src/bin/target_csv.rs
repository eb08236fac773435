//! target-csv: Singer target that writes one CSV file per stream
//!
//! Reads Singer messages (SCHEMA, RECORD, STATE) as newline-delimited JSON
//! on stdin and persists records as CSV. Checkpoint STATE lines go to
//! stdout for the orchestrator to store as resume points; all diagnostics
//! go to stderr.
//!
//! Usage:
//!   # With defaults (CSV files in the current directory)
//!   some-tap | target-csv
//!
//!   # With a config file
//!   some-tap | target-csv --config config.json
//!
//! Exits 0 on clean end-of-stream, 1 on any fatal error.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use std::io::{stdin, stdout};
use target_csv::Config;

#[derive(Parser, Debug)]
#[command(name = "target-csv")]
#[command(about = "Singer target that writes CSV files", long_about = None)]
struct Args {
    /// Config file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,
}

fn main() -> Result<()> {
    // Logs must go to stderr; stdout carries only checkpoint STATE lines.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("failed to load config file {path}"))?
        }
        None => Config::default(),
    };

    let stdin = stdin();
    let input = stdin.lock();
    let mut control = stdout().lock();

    target_csv::run(input, &mut control, &config)?;

    debug!("exiting normally");
    Ok(())
}
