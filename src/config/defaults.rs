//! System-wide default constants.
//!
//! Every value here is an assumption, not a measurement. They seed the
//! `#[serde(default = ...)]` functions in [`AnalysisConfig`](super::AnalysisConfig)
//! so a config file can override each one.

// ============================================================================
// Simulation
// ============================================================================

/// Monte Carlo trial count.
pub const NUM_SIM: usize = 1_000;

/// One-sigma revenue-meter error as a fraction of measured energy.
pub const METER_UNCERTAINTY: f64 = 0.005;

/// One-sigma spread of the total loss fraction.
pub const LOSS_UNCERTAINTY: f64 = 0.05;

/// Base seed for per-trial random streams.
pub const SIMULATION_SEED: u64 = 42;

/// Wall-clock budget for one analysis run (seconds).
pub const ANALYSIS_TIMEOUT_SECS: u64 = 60;

/// Trials between cancellation checks inside one worker.
pub const CANCELLATION_CHECK_STRIDE: usize = 64;

// ============================================================================
// Plant Assumptions
// ============================================================================

/// Standard sea-level air density (kg/m³) used for the synthetic reference.
pub const AIR_DENSITY: f64 = 1.225;

/// Nominal wake loss fraction.
pub const WAKE_LOSS: f64 = 0.05;

/// Nominal electrical loss fraction.
pub const ELECTRICAL_LOSS: f64 = 0.02;

/// Ambient temperature substituted when no temperature channel exists (°C).
pub const TEMPERATURE_C: f64 = 20.0;

/// Asset identifier used when no turbine column is detected.
pub const ASSET_ID: &str = "T01";

/// SCADA sampling interval assumed when timestamps cannot tell us (hours).
///
/// 10-minute averages are the industry norm.
pub const SAMPLING_INTERVAL_HOURS: f64 = 1.0 / 6.0;

/// Upper bound on a simulated loss fraction.
pub const MAX_LOSS_FRACTION: f64 = 0.99;

// ============================================================================
// Normalization
// ============================================================================

/// Malformed cells logged individually before switching to a summary.
pub const MALFORMED_LOG_LIMIT: usize = 10;

// ============================================================================
// Conversions
// ============================================================================

pub const KWH_PER_MWH: f64 = 1_000.0;
pub const KWH_PER_GWH: f64 = 1_000_000.0;
