//! Synthetic SCADA Generator
//!
//! Produces a `RawDataset` JSON document for demos and soak tests of the
//! `windaep` pipeline:
//! - Weibull-distributed wind per sample, scaled per turbine
//! - Cubic power curve between cut-in and rated speed, zero above cut-out
//! - Sensor dropouts (null power) and malformed cells (`"ERR"`)
//!
//! # Usage
//! ```bash
//! synthetic-scada --turbines 3 --hours 720 --seed 7 > plant.json
//! windaep plant.json --pretty
//! ```

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal, Weibull};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

use windaep::{CellValue, RawDataset};

// ============================================================================
// Turbine Constants
// ============================================================================

/// Rated output (kW)
const RATED_POWER_KW: f64 = 2000.0;
/// Cut-in wind speed (m/s)
const CUT_IN_MS: f64 = 3.0;
/// Rated wind speed (m/s)
const RATED_SPEED_MS: f64 = 12.0;
/// Cut-out wind speed (m/s)
const CUT_OUT_MS: f64 = 25.0;
/// Weibull shape; 2.0 is the Rayleigh case typical of onshore sites
const WEIBULL_SHAPE: f64 = 2.0;

const HEADERS: [&str; 6] = [
    "Timestamp",
    "Turbine",
    "Wind Speed (m/s)",
    "Wind Direction",
    "Ambient Temp",
    "Active Power (kW)",
];

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "synthetic-scada")]
#[command(about = "Synthetic wind-plant SCADA generator for windaep")]
#[command(version)]
struct Args {
    /// Number of turbines
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=200))]
    turbines: u32,

    /// Duration in hours
    #[arg(short = 'H', long, default_value = "720")]
    hours: u32,

    /// Sampling interval in minutes
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=1440))]
    interval_minutes: u32,

    /// Weibull scale parameter (m/s), roughly 1.13 × mean wind speed
    #[arg(long, default_value = "8.0")]
    weibull_scale: f64,

    /// Probability that a power reading is missing
    #[arg(long, default_value = "0.01")]
    dropout_rate: f64,

    /// Probability that a numeric cell is garbage text
    #[arg(long, default_value = "0.002")]
    malformed_rate: f64,

    /// Start date (YYYY-MM-DD)
    #[arg(long, default_value = "2023-01-01")]
    start: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ============================================================================
// Generation
// ============================================================================

/// Idealised power curve: cubic ramp from cut-in to rated, flat to cut-out.
fn power_curve_kw(ws: f64) -> f64 {
    if !(CUT_IN_MS..CUT_OUT_MS).contains(&ws) {
        0.0
    } else if ws >= RATED_SPEED_MS {
        RATED_POWER_KW
    } else {
        let frac = (ws - CUT_IN_MS) / (RATED_SPEED_MS - CUT_IN_MS);
        RATED_POWER_KW * frac.powi(3)
    }
}

struct Generator {
    rng: StdRng,
    wind: Weibull<f64>,
    direction_noise: Normal<f64>,
    temperature_noise: Normal<f64>,
    dropout_rate: f64,
    malformed_rate: f64,
}

impl Generator {
    fn new(args: &Args) -> Result<Self> {
        let rng = match args.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            wind: Weibull::new(args.weibull_scale, WEIBULL_SHAPE)
                .map_err(|e| anyhow::anyhow!("invalid Weibull scale {}: {e:?}", args.weibull_scale))?,
            direction_noise: Normal::new(0.0, 25.0).context("direction noise")?,
            temperature_noise: Normal::new(0.0, 1.5).context("temperature noise")?,
            dropout_rate: args.dropout_rate.clamp(0.0, 1.0),
            malformed_rate: args.malformed_rate.clamp(0.0, 1.0),
        })
    }

    /// Numeric cell, occasionally corrupted.
    fn numeric(&mut self, value: f64) -> CellValue {
        if self.rng.gen_bool(self.malformed_rate) {
            CellValue::Text("ERR".to_string())
        } else {
            CellValue::Number((value * 100.0).round() / 100.0)
        }
    }

    fn row(&mut self, ts: NaiveDateTime, turbine: u32, exposure: f64) -> Vec<CellValue> {
        let ws = self.wind.sample(&mut self.rng) * exposure;
        let direction = (240.0 + self.direction_noise.sample(&mut self.rng)).rem_euclid(360.0);
        // Seasonal swing around 10 °C
        let day = f64::from(ts.ordinal());
        let temperature = 10.0 - 8.0 * (2.0 * std::f64::consts::PI * day / 365.0).cos()
            + self.temperature_noise.sample(&mut self.rng);

        let power = if self.rng.gen_bool(self.dropout_rate) {
            CellValue::Null
        } else {
            self.numeric(power_curve_kw(ws))
        };

        vec![
            CellValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            CellValue::Text(format!("WTG{:02}", turbine + 1)),
            self.numeric(ws),
            self.numeric(direction),
            self.numeric(temperature),
            power,
        ]
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let start = NaiveDate::parse_from_str(&args.start, "%Y-%m-%d")
        .with_context(|| format!("Invalid --start date '{}'", args.start))?
        .and_hms_opt(0, 0, 0)
        .context("Invalid start time")?;

    let mut generator = Generator::new(&args)?;
    // Each turbine sees a slightly different free-stream exposure
    let exposures: Vec<f64> = (0..args.turbines)
        .map(|_| generator.rng.gen_range(0.9..1.1))
        .collect();

    let steps = u64::from(args.hours) * 60 / u64::from(args.interval_minutes);
    let step = Duration::minutes(i64::from(args.interval_minutes));
    let mut dataset = RawDataset::new(HEADERS.iter().map(|h| h.to_string()).collect());

    let mut ts = start;
    for _ in 0..steps {
        for (turbine, exposure) in (0..args.turbines).zip(exposures.iter()) {
            let row = generator.row(ts, turbine, *exposure);
            dataset.push_row(row);
        }
        ts += step;
    }

    info!(
        turbines = args.turbines,
        hours = args.hours,
        rows = dataset.row_count(),
        "Synthetic SCADA generated"
    );

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &dataset).context("Failed to write dataset")?;
            writer.flush()?;
            info!(path = %path.display(), "Dataset written");
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer(&mut writer, &dataset).context("Failed to write dataset")?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_curve_regions() {
        assert_eq!(power_curve_kw(2.0), 0.0);
        assert_eq!(power_curve_kw(CUT_IN_MS), 0.0);
        assert!((power_curve_kw(7.5) - RATED_POWER_KW * 0.125).abs() < 1e-9);
        assert_eq!(power_curve_kw(15.0), RATED_POWER_KW);
        assert_eq!(power_curve_kw(CUT_OUT_MS), 0.0);
    }
}
