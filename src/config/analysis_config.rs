//! Analysis Configuration - Simulation parameters and plant assumptions as TOML values
//!
//! Each struct implements `Default` with the constants from
//! [`defaults`](super::defaults), so an absent or partial config file always
//! yields a complete, valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::estimator::SimulationParams;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "WINDAEP_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "windaep.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an analysis run.
///
/// Load with `AnalysisConfig::load()` which searches:
/// 1. `$WINDAEP_CONFIG` env var
/// 2. `./windaep.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Monte Carlo settings
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Unmeasured plant assumptions
    #[serde(default)]
    pub assumptions: AssumptionsConfig,

    /// Column detection behaviour
    #[serde(default)]
    pub mapping: MappingConfig,
}

impl AnalysisConfig {
    /// Load configuration using the standard search order:
    /// 1. `$WINDAEP_CONFIG` environment variable
    /// 2. `./windaep.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded analysis config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded analysis config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are logged, not fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every value for range and consistency.
    ///
    /// Rules:
    /// - `num_sim` must be >= 1
    /// - Uncertainties and loss fractions must lie in `[0, 1)`
    /// - Densities and intervals must be positive
    /// - All floating-point values must be finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = SimulationParams::from_config(self).problems();
        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Total nominal loss, combining wake and electrical losses multiplicatively.
    pub fn nominal_loss_fraction(&self) -> f64 {
        let a = &self.assumptions;
        1.0 - (1.0 - a.wake_loss) * (1.0 - a.electrical_loss)
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Simulation Config
// ============================================================================

/// Monte Carlo AEP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent trials. 1 gives a deterministic point estimate.
    #[serde(default = "default_num_sim")]
    pub num_sim: usize,

    /// One-sigma meter error, fraction of measured energy. Must be in `[0, 1)`.
    #[serde(default = "default_meter_uncertainty")]
    pub meter_uncertainty: f64,

    /// One-sigma spread of the loss fraction. Must be in `[0, 1)`.
    #[serde(default = "default_loss_uncertainty")]
    pub loss_uncertainty: f64,

    /// Base seed; trial `i` uses a stream derived from `seed` and `i`.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Wall-clock budget enforced by the CLI (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_num_sim() -> usize { defaults::NUM_SIM }
fn default_meter_uncertainty() -> f64 { defaults::METER_UNCERTAINTY }
fn default_loss_uncertainty() -> f64 { defaults::LOSS_UNCERTAINTY }
fn default_seed() -> u64 { defaults::SIMULATION_SEED }
fn default_timeout_secs() -> u64 { defaults::ANALYSIS_TIMEOUT_SECS }

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_sim: default_num_sim(),
            meter_uncertainty: default_meter_uncertainty(),
            loss_uncertainty: default_loss_uncertainty(),
            seed: default_seed(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============================================================================
// Assumptions Config
// ============================================================================

/// Plant-level assumptions that are not measured by SCADA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionsConfig {
    /// Air density recorded on synthetic reference periods (kg/m³).
    #[serde(default = "default_air_density")]
    pub air_density: f64,

    /// Nominal wake loss fraction reported and fed into the loss draw.
    #[serde(default = "default_wake_loss")]
    pub wake_loss: f64,

    /// Nominal electrical loss fraction.
    #[serde(default = "default_electrical_loss")]
    pub electrical_loss: f64,

    /// Temperature substituted when no temperature column exists (°C).
    #[serde(default = "default_temperature_c")]
    pub default_temperature_c: f64,

    /// Asset id substituted when no turbine column exists.
    #[serde(default = "default_asset_id")]
    pub default_asset_id: String,

    /// Fixed SCADA interval in hours. When unset it is detected from timestamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_interval_hours: Option<f64>,

    /// Interval used when detection is impossible (hours).
    #[serde(default = "default_fallback_interval")]
    pub fallback_interval_hours: f64,
}

fn default_air_density() -> f64 { defaults::AIR_DENSITY }
fn default_wake_loss() -> f64 { defaults::WAKE_LOSS }
fn default_electrical_loss() -> f64 { defaults::ELECTRICAL_LOSS }
fn default_temperature_c() -> f64 { defaults::TEMPERATURE_C }
fn default_asset_id() -> String { defaults::ASSET_ID.to_string() }
fn default_fallback_interval() -> f64 { defaults::SAMPLING_INTERVAL_HOURS }

impl Default for AssumptionsConfig {
    fn default() -> Self {
        Self {
            air_density: default_air_density(),
            wake_loss: default_wake_loss(),
            electrical_loss: default_electrical_loss(),
            default_temperature_c: default_temperature_c(),
            default_asset_id: default_asset_id(),
            sampling_interval_hours: None,
            fallback_interval_hours: default_fallback_interval(),
        }
    }
}

// ============================================================================
// Mapping Config
// ============================================================================

/// Column Mapper behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// When true, undetected `time`/`power` roles fall back to the first and
    /// second columns. When false a missing role is fatal.
    #[serde(default)]
    pub positional_fallback: bool,
}

// ============================================================================
// Tests
// ============================================================================
