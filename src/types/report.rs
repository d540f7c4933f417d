//! Wind-plant performance report returned by the pipeline.

use serde::{Deserialize, Serialize};

/// Headline plant figures. Energies are in GWh, fractions in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub gross_aep: f64,
    pub net_aep: f64,
    /// Standard deviation of the simulated net AEP (GWh).
    pub net_aep_std: f64,
    /// Relative uncertainty, `net_aep_std / net_aep` (0 when net AEP is 0).
    pub uncertainty: f64,
    pub p50_aep: f64,
    /// AEP exceeded with 90% probability.
    pub p90_aep: f64,
    pub availability: f64,
    pub capacity_factor: f64,
    pub wake_loss: f64,
    pub electrical_loss: f64,
    /// `(net_aep - expected) / expected` when an expected AEP was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eya_gap: Option<f64>,
    /// Mean yaw misalignment (degrees); needs a nacelle-position channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaw_misalignment: Option<f64>,
    pub num_sim: usize,
    pub sampling_interval_hours: f64,
    pub total_rows: usize,
    pub valid_timestamps: usize,
    pub data_quality: DataQuality,
}

/// Counts of cells that failed coercion and were replaced by defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    pub malformed_time: usize,
    pub malformed_power: usize,
    pub malformed_wind_speed: usize,
    pub malformed_wind_direction: usize,
    pub malformed_temperature: usize,
    pub malformed_asset_id: usize,
}

impl DataQuality {
    pub fn total(&self) -> usize {
        self.malformed_time
            + self.malformed_power
            + self.malformed_wind_speed
            + self.malformed_wind_direction
            + self.malformed_temperature
            + self.malformed_asset_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProduction {
    pub year: i32,
    /// Three-letter month abbreviation, e.g. `"Jan"`.
    pub month_label: String,
    pub energy_gwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurvePoint {
    /// Lower edge of a 1 m/s wind-speed bin.
    pub wind_speed_bin: i64,
    pub mean_power_kw: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbinePerformance {
    pub asset_id: String,
    pub energy_mwh: f64,
}

/// Complete analysis output. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub monthly_production: Vec<MonthlyProduction>,
    pub power_curve: Vec<PowerCurvePoint>,
    pub turbine_performance: Vec<TurbinePerformance>,
    pub status: String,
    pub message: String,
}
