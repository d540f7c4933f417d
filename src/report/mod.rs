//! Report Aggregator
//!
//! Derives the reporting views from the canonical dataset and the AEP
//! distribution:
//!
//! - monthly production (GWh, chronological, time-valid rows only)
//! - binned power curve (1 m/s bins, ascending, populated bins only)
//! - turbine ranking (MWh, descending, ties keep first-seen order)
//! - availability, capacity factor and expected-AEP gap
//!
//! Availability counts every row, including rows whose timestamp failed to
//! parse. Energy sums use the resolved sampling interval.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::config::{defaults, AnalysisConfig};
use crate::estimator::AepDistribution;
use crate::normalize::{month_key, NormalizedDataset};
use crate::types::{
    CanonicalRecord, MonthlyProduction, PowerCurvePoint, Report, ReportSummary, TurbinePerformance,
};

pub const STATUS_SUCCESS: &str = "success";
pub const MESSAGE_COMPLETE: &str = "Analysis complete";

/// Assembles a [`Report`]. Stateless apart from the borrowed config.
pub struct ReportAggregator<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn aggregate(
        &self,
        dataset: &NormalizedDataset,
        distribution: &AepDistribution,
        expected_aep: Option<f64>,
    ) -> Report {
        let records = &dataset.records;
        let dt = dataset.interval.hours;
        let aep = distribution.summary();

        let summary = ReportSummary {
            gross_aep: aep.gross_aep,
            net_aep: aep.net_aep,
            net_aep_std: aep.net_aep_std,
            uncertainty: aep.uncertainty,
            p50_aep: aep.p50,
            p90_aep: aep.p90,
            availability: availability(records),
            capacity_factor: capacity_factor(records, aep.net_aep),
            wake_loss: self.config.assumptions.wake_loss,
            electrical_loss: self.config.assumptions.electrical_loss,
            eya_gap: eya_gap(aep.net_aep, expected_aep),
            // No nacelle-position channel is mapped
            yaw_misalignment: None,
            num_sim: distribution.len(),
            sampling_interval_hours: dt,
            total_rows: dataset.total_rows(),
            valid_timestamps: dataset.valid_timestamps(),
            data_quality: dataset.quality.clone(),
        };

        let report = Report {
            monthly_production: monthly_production(records, dt),
            power_curve: power_curve(records),
            turbine_performance: turbine_ranking(records, dt),
            summary,
            status: STATUS_SUCCESS.to_string(),
            message: MESSAGE_COMPLETE.to_string(),
        };

        info!(
            net_aep_gwh = format!("{:.4}", report.summary.net_aep),
            gross_aep_gwh = format!("{:.4}", report.summary.gross_aep),
            availability = format!("{:.3}", report.summary.availability),
            months = report.monthly_production.len(),
            bins = report.power_curve.len(),
            turbines = report.turbine_performance.len(),
            "Report assembled"
        );
        report
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Energy per calendar month in GWh. Rows without a timestamp are skipped.
pub fn monthly_production(records: &[CanonicalRecord], interval_hours: f64) -> Vec<MonthlyProduction> {
    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for r in records {
        if let Some(ts) = &r.timestamp {
            *months.entry(month_key(ts)).or_insert(0.0) += r.power_kw * interval_hours;
        }
    }

    months
        .into_iter()
        .map(|((year, month), kwh)| MonthlyProduction {
            year,
            month_label: month_label(year, month),
            energy_gwh: kwh / defaults::KWH_PER_GWH,
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b").to_string())
        .unwrap_or_default()
}

/// Mean power per integer wind-speed bin (floor). Negative or non-finite
/// speeds fall outside every bin.
pub fn power_curve(records: &[CanonicalRecord]) -> Vec<PowerCurvePoint> {
    let mut bins: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for r in records {
        let ws = r.wind_speed_ms;
        if !ws.is_finite() || ws < 0.0 {
            continue;
        }
        let bin = bins.entry(ws.floor() as i64).or_insert((0.0, 0));
        bin.0 += r.power_kw;
        bin.1 += 1;
    }

    bins.into_iter()
        .map(|(wind_speed_bin, (sum, count))| PowerCurvePoint {
            wind_speed_bin,
            mean_power_kw: sum / count as f64,
            sample_count: count,
        })
        .collect()
}

/// Energy per asset in MWh, highest first.
pub fn turbine_ranking(records: &[CanonicalRecord], interval_hours: f64) -> Vec<TurbinePerformance> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut ranking: Vec<TurbinePerformance> = Vec::new();

    for r in records {
        let slot = *index.entry(r.asset_id.as_str()).or_insert_with(|| {
            ranking.push(TurbinePerformance {
                asset_id: r.asset_id.clone(),
                energy_mwh: 0.0,
            });
            ranking.len() - 1
        });
        ranking[slot].energy_mwh += r.power_kw * interval_hours / defaults::KWH_PER_MWH;
    }

    // Stable sort: equal energies stay in first-seen order
    ranking.sort_by(|a, b| b.energy_mwh.partial_cmp(&a.energy_mwh).unwrap_or(Ordering::Equal));
    ranking
}

/// Share of all rows producing power.
pub fn availability(records: &[CanonicalRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let producing = records.iter().filter(|r| r.power_kw > 0.0).count();
    producing as f64 / records.len() as f64
}

/// Net energy over `max power × elapsed hours` between the first and last
/// valid timestamp. 0 when either factor is not positive.
pub fn capacity_factor(records: &[CanonicalRecord], net_aep_gwh: f64) -> f64 {
    let max_power = records
        .iter()
        .map(|r| r.power_kw)
        .filter(|p| p.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);

    let mut stamps = records.iter().filter_map(|r| r.timestamp);
    let Some(first) = stamps.next() else { return 0.0 };
    let (earliest, latest) = stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
    let elapsed_hours = (latest - earliest).num_seconds() as f64 / 3600.0;

    if max_power <= 0.0 || elapsed_hours <= 0.0 {
        return 0.0;
    }
    net_aep_gwh * defaults::KWH_PER_GWH / (max_power * elapsed_hours)
}

/// Relative deviation from the expected AEP, when one was supplied.
pub fn eya_gap(net_aep: f64, expected_aep: Option<f64>) -> Option<f64> {
    expected_aep
        .filter(|e| e.is_finite() && *e > 0.0)
        .map(|e| (net_aep - e) / e)
}

// ============================================================================
// Tests
// ============================================================================
