//! windaep - Wind Plant AEP Analysis CLI
//!
//! Reads a SCADA dataset in the `RawDataset` JSON shape
//! (`{"headers": [...], "rows": [[...], ...]}`), runs the analysis pipeline
//! and prints the report JSON on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Default config search ($WINDAEP_CONFIG, ./windaep.toml, built-ins)
//! windaep scada.json --expected-aep 42.0 --pretty
//!
//! # Quick deterministic point estimate on hourly data
//! windaep scada.json --num-sim 1 --interval-hours 1
//!
//! # Pipe a synthetic plant straight in
//! synthetic-scada --turbines 4 --hours 2000 > plant.json && windaep plant.json
//! ```
//!
//! # Exit Codes
//!
//! - `0`: report printed
//! - `2`: invalid input or parameters (structured error printed)
//! - `1`: cancelled, timed out or internal failure
//!
//! # Environment Variables
//!
//! - `WINDAEP_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use windaep::{AnalysisConfig, AnalysisError, AnalysisOverrides, Analyzer, ErrorReport, RawDataset};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "windaep")]
#[command(about = "Wind plant SCADA-to-AEP analysis")]
#[command(version)]
struct CliArgs {
    /// Dataset JSON file (`{"headers": [...], "rows": [[...]]}`)
    dataset: PathBuf,

    /// Pre-construction energy yield assessment (GWh/yr) for the EYA gap
    #[arg(long, value_name = "GWH")]
    expected_aep: Option<f64>,

    /// Monte Carlo trial count (1 = deterministic point estimate)
    #[arg(long)]
    num_sim: Option<usize>,

    /// One-sigma meter error as a fraction, in [0, 1)
    #[arg(long)]
    meter_uncertainty: Option<f64>,

    /// One-sigma loss spread as a fraction, in [0, 1)
    #[arg(long)]
    loss_uncertainty: Option<f64>,

    /// Fixed SCADA sampling interval in hours (detected when omitted)
    #[arg(long, value_name = "HOURS")]
    interval_hours: Option<f64>,

    /// Config file, overriding the WINDAEP_CONFIG/./windaep.toml search
    #[arg(short, long, env = "WINDAEP_CONFIG")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl CliArgs {
    fn overrides(&self) -> AnalysisOverrides {
        AnalysisOverrides {
            num_sim: self.num_sim,
            meter_uncertainty: self.meter_uncertainty,
            loss_uncertainty: self.loss_uncertainty,
            sampling_interval_hours: self.interval_hours,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn load_config(path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => {
            let config = AnalysisConfig::load_from_file(p)
                .with_context(|| format!("Failed to load config {}", p.display()))?;
            info!(path = %p.display(), "Loaded analysis config");
            Ok(config)
        }
        None => Ok(AnalysisConfig::load()),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

/// Print the structured error and pick the exit code.
fn report_failure(err: &AnalysisError, pretty: bool) -> Result<i32> {
    error!(kind = ?err.kind(), "{err}");
    print_json(&ErrorReport::from(err), pretty)?;
    Ok(if err.is_client_error() { 2 } else { 1 })
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = args.overrides().apply(&load_config(args.config.as_ref())?);
    let timeout_secs = config.simulation.timeout_secs;

    let raw = std::fs::read_to_string(&args.dataset)
        .with_context(|| format!("Failed to read dataset {}", args.dataset.display()))?;
    let dataset: RawDataset = match serde_json::from_str(&raw) {
        Ok(ds) => ds,
        Err(e) => {
            let err = AnalysisError::UnsupportedInput(format!(
                "{} is not a headers/rows dataset: {e}",
                args.dataset.display()
            ));
            let code = report_failure(&err, args.pretty)?;
            std::process::exit(code);
        }
    };

    // Ctrl+C and the wall-clock budget both cancel the simulation
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        warn!("Received Ctrl+C, cancelling analysis");
        shutdown_token.cancel();
    });

    let analyzer = Analyzer::new(config).with_cancellation(cancel_token.clone());
    let expected_aep = args.expected_aep;
    let mut handle = tokio::task::spawn_blocking(move || analyzer.analyze(&dataset, expected_aep));

    let joined = if timeout_secs == 0 {
        (&mut handle).await
    } else {
        match tokio::time::timeout(Duration::from_secs(timeout_secs), &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(timeout_secs, "Analysis exceeded its time budget, cancelling");
                cancel_token.cancel();
                (&mut handle).await
            }
        }
    };

    match joined.context("Analysis task panicked")? {
        Ok(report) => {
            info!(net_aep_gwh = format!("{:.4}", report.summary.net_aep), "Analysis complete");
            print_json(&report, args.pretty)
        }
        Err(err) => {
            let code = report_failure(&err, args.pretty)?;
            std::process::exit(code);
        }
    }
}
