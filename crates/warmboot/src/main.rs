//! warmboot-inspect: validates a warm-boot snapshot and summarizes it.
//!
//! Loads the document, runs the same structural checks a booting agent
//! would, restores it into an empty cache and prints per-section counts.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use sonic_warmboot::audit::{init_logging, init_logging_pretty};
use sonic_warmboot::{WarmBootCache, WarmBootConfig, WarmBootSnapshot};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Warm-boot snapshot inspector
#[derive(Parser, Debug)]
#[command(name = "warmboot-inspect")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Snapshot document to inspect
    snapshot: PathBuf,

    /// Platform config (JSON); defaults apply to missing fields
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "warn")]
    log_level: String,
}

fn load_config(path: Option<&PathBuf>) -> Result<WarmBootConfig> {
    let Some(path) = path else {
        return Ok(WarmBootConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    WarmBootConfig::from_json(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

fn inspect(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let text = fs::read_to_string(&args.snapshot)
        .with_context(|| format!("failed to read snapshot {}", args.snapshot.display()))?;
    let snapshot = WarmBootSnapshot::from_json(&text)
        .with_context(|| format!("{} is not a valid snapshot", args.snapshot.display()))?;

    let mut cache = WarmBootCache::new(config);
    cache
        .restore(&snapshot)
        .context("snapshot does not restore")?;
    info!("restored {}", args.snapshot.display());

    let sections = snapshot.section_counts();
    if args.json {
        let summary = serde_json::json!({
            "version": snapshot.version,
            "captured_at": snapshot.captured_at,
            "sections": sections,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("snapshot: {}", args.snapshot.display());
        println!("version:  {}", snapshot.version);
        if let Some(at) = snapshot.captured_at {
            println!("captured: {}", at.to_rfc3339());
        }
        for (section, count) in &sections {
            println!("  {:<18} {}", section, count);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.json {
        init_logging(&args.log_level);
    } else {
        init_logging_pretty(&args.log_level);
    }

    match inspect(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("warmboot-inspect: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
