//! Reference (reanalysis) series
//!
//! A long-term meteorological record normally comes from an external
//! reanalysis product. When none is supplied, [`SyntheticReference`]
//! resamples the SCADA data itself into calendar months. Anything that can
//! produce a [`ReferenceSeries`] can stand in via [`ReferenceSource`].

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::month_key;
use crate::types::CanonicalRecord;

/// One monthly reference entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencePeriod {
    /// First day of the calendar month.
    pub period_start: NaiveDate,
    pub wind_speed_ms: f64,
    pub temperature_c: f64,
    /// Air density (kg/m³).
    pub air_density: f64,
}

/// Monthly reference series, ascending by `period_start`, one entry per month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceSeries {
    periods: Vec<ReferencePeriod>,
}

impl ReferenceSeries {
    /// Build from periods in any order. Duplicated months keep the first entry.
    pub fn from_periods(mut periods: Vec<ReferencePeriod>) -> Self {
        periods.sort_by_key(|p| p.period_start);
        periods.dedup_by_key(|p| p.period_start);
        Self { periods }
    }

    pub fn periods(&self) -> &[ReferencePeriod] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Mean of the monthly wind speeds (each month weighted equally).
    pub fn mean_wind_speed(&self) -> Option<f64> {
        if self.periods.is_empty() {
            return None;
        }
        let sum: f64 = self.periods.iter().map(|p| p.wind_speed_ms).sum();
        Some(sum / self.periods.len() as f64)
    }
}

/// Produces the reference series consumed by the estimator.
pub trait ReferenceSource: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn build(&self, records: &[CanonicalRecord]) -> ReferenceSeries;
}

/// Reference series derived from the SCADA records themselves.
#[derive(Debug, Clone)]
pub struct SyntheticReference {
    air_density: f64,
}

impl SyntheticReference {
    pub fn new(air_density: f64) -> Self {
        Self { air_density }
    }
}

#[derive(Default)]
struct MonthAccumulator {
    wind_speed_sum: f64,
    temperature_sum: f64,
    count: usize,
}

impl ReferenceSource for SyntheticReference {
    fn name(&self) -> &str {
        "synthetic-monthly"
    }

    /// Average wind speed and temperature per calendar month. Records with
    /// no timestamp are skipped.
    fn build(&self, records: &[CanonicalRecord]) -> ReferenceSeries {
        let mut months: BTreeMap<(i32, u32), MonthAccumulator> = BTreeMap::new();
        for record in records {
            let Some(ts) = record.timestamp.as_ref() else { continue };
            let acc = months.entry(month_key(ts)).or_default();
            acc.wind_speed_sum += record.wind_speed_ms;
            acc.temperature_sum += record.temperature_c;
            acc.count += 1;
        }

        let periods: Vec<ReferencePeriod> = months
            .into_iter()
            .filter_map(|((year, month), acc)| {
                let n = acc.count as f64;
                Some(ReferencePeriod {
                    period_start: NaiveDate::from_ymd_opt(year, month, 1)?,
                    wind_speed_ms: acc.wind_speed_sum / n,
                    temperature_c: acc.temperature_sum / n,
                    air_density: self.air_density,
                })
            })
            .collect();

        debug!(months = periods.len(), source = self.name(), "Reference series built");
        // BTreeMap iteration is already ascending and unique
        ReferenceSeries { periods }
    }
}
