//! Dataset Normalizer: raw cells to canonical records
//!
//! Every raw row yields exactly one [`CanonicalRecord`]; nothing is dropped.
//! Cells that fail coercion are replaced by documented defaults and counted
//! in [`DataQuality`]:
//!
//! | role           | on failure                              |
//! |----------------|-----------------------------------------|
//! | time           | `None` (excluded from temporal aggregates) |
//! | power          | `0.0`                                   |
//! | wind_speed     | `0.0`                                   |
//! | wind_direction | `None`                                  |
//! | temperature    | configured default (20 °C)              |
//! | asset_id       | configured default (`"T01"`)            |

pub mod reference;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{defaults, AnalysisConfig};
use crate::mapping::{FieldRole, FieldRoleMap};
use crate::types::{AnalysisError, CanonicalRecord, CellValue, DataQuality, RawDataset};

pub use reference::{ReferencePeriod, ReferenceSeries, ReferenceSource, SyntheticReference};

// ============================================================================
// Output
// ============================================================================

/// A cell that failed coercion and was replaced by a default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedValue {
    pub row: usize,
    pub role: FieldRole,
    pub raw: String,
}

/// Where the sampling interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalSource {
    Configured,
    Detected,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingInterval {
    pub hours: f64,
    pub source: IntervalSource,
}

/// Canonical dataset plus everything learned while building it.
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    pub records: Vec<CanonicalRecord>,
    pub quality: DataQuality,
    /// First few malformed cells, for diagnostics.
    pub malformed_samples: Vec<MalformedValue>,
    pub interval: SamplingInterval,
}

impl NormalizedDataset {
    pub fn total_rows(&self) -> usize {
        self.records.len()
    }

    pub fn valid_timestamps(&self) -> usize {
        self.records.iter().filter(|r| r.timestamp.is_some()).count()
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Coerces a [`RawDataset`] into canonical records using a [`FieldRoleMap`].
pub struct Normalizer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Build the canonical dataset.
    ///
    /// Fails only when `time` or `power` is unmapped; per-cell problems are
    /// absorbed.
    pub fn normalize(
        &self,
        dataset: &RawDataset,
        roles: &FieldRoleMap,
    ) -> Result<NormalizedDataset, AnalysisError> {
        roles.ensure_required()?;
        let time_col = roles.require(FieldRole::Time)?.index;
        let power_col = roles.require(FieldRole::Power)?.index;
        let speed_col = roles.column(FieldRole::WindSpeed);
        let dir_col = roles.column(FieldRole::WindDirection);
        let temp_col = roles.column(FieldRole::Temperature);
        let asset_col = roles.column(FieldRole::AssetId);

        let assumptions = &self.config.assumptions;
        let mut tracker = MalformedTracker::default();
        let mut records = Vec::with_capacity(dataset.row_count());

        for row in 0..dataset.row_count() {
            let time_cell = dataset.cell(row, time_col);
            let timestamp = parse_timestamp(time_cell);
            if timestamp.is_none() {
                tracker.record(row, FieldRole::Time, time_cell);
            }

            let power_cell = dataset.cell(row, power_col);
            let power_kw = power_cell.as_f64().unwrap_or_else(|| {
                tracker.record(row, FieldRole::Power, power_cell);
                0.0
            });

            let wind_speed_ms = match speed_col {
                Some(col) => {
                    let cell = dataset.cell(row, col);
                    cell.as_f64().unwrap_or_else(|| {
                        tracker.record(row, FieldRole::WindSpeed, cell);
                        0.0
                    })
                }
                None => 0.0,
            };

            let wind_direction_deg = dir_col.and_then(|col| {
                let cell = dataset.cell(row, col);
                let value = cell.as_f64();
                if value.is_none() {
                    tracker.record(row, FieldRole::WindDirection, cell);
                }
                value
            });

            let temperature_c = match temp_col {
                Some(col) => {
                    let cell = dataset.cell(row, col);
                    cell.as_f64().unwrap_or_else(|| {
                        tracker.record(row, FieldRole::Temperature, cell);
                        assumptions.default_temperature_c
                    })
                }
                None => assumptions.default_temperature_c,
            };

            let asset_id = match asset_col {
                Some(col) => {
                    let cell = dataset.cell(row, col);
                    cell.as_text().unwrap_or_else(|| {
                        tracker.record(row, FieldRole::AssetId, cell);
                        assumptions.default_asset_id.clone()
                    })
                }
                None => assumptions.default_asset_id.clone(),
            };

            records.push(CanonicalRecord {
                timestamp,
                power_kw,
                wind_speed_ms,
                wind_direction_deg,
                temperature_c,
                asset_id,
            });
        }

        let interval = resolve_interval(self.config, &records);
        let quality = tracker.quality;

        if quality.total() > 0 {
            warn!(
                malformed = quality.total(),
                time = quality.malformed_time,
                power = quality.malformed_power,
                wind_speed = quality.malformed_wind_speed,
                asset_id = quality.malformed_asset_id,
                "Malformed cells replaced by defaults"
            );
        }
        if speed_col.is_none() {
            info!("No wind speed column detected, defaulting to 0.0 m/s");
        }
        if asset_col.is_none() {
            info!(asset_id = %assumptions.default_asset_id, "No turbine column detected, using default asset id");
        }

        let normalized = NormalizedDataset {
            records,
            quality,
            malformed_samples: tracker.samples,
            interval,
        };
        info!(
            rows = normalized.total_rows(),
            valid_timestamps = normalized.valid_timestamps(),
            interval_hours = format!("{:.4}", interval.hours),
            interval_source = ?interval.source,
            "Dataset normalized"
        );
        Ok(normalized)
    }
}

/// Counts malformed cells and keeps the first few for diagnostics.
#[derive(Default)]
struct MalformedTracker {
    quality: DataQuality,
    samples: Vec<MalformedValue>,
}

impl MalformedTracker {
    fn record(&mut self, row: usize, role: FieldRole, cell: &CellValue) {
        let counter = match role {
            FieldRole::Time => &mut self.quality.malformed_time,
            FieldRole::Power => &mut self.quality.malformed_power,
            FieldRole::WindSpeed => &mut self.quality.malformed_wind_speed,
            FieldRole::WindDirection => &mut self.quality.malformed_wind_direction,
            FieldRole::Temperature => &mut self.quality.malformed_temperature,
            FieldRole::AssetId => &mut self.quality.malformed_asset_id,
        };
        *counter += 1;

        if self.samples.len() < defaults::MALFORMED_LOG_LIMIT {
            let raw = cell.describe();
            debug!(row, role = %role, value = %raw, "Malformed cell, substituting default");
            self.samples.push(MalformedValue { row, role, raw });
        }
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parse a time cell. Accepts Unix epochs (seconds or milliseconds, from
/// 2001 onward) and common ISO-like text formats; naive times are UTC.
pub fn parse_timestamp(cell: &CellValue) -> Option<DateTime<Utc>> {
    match cell {
        CellValue::Null | CellValue::Other(_) => None,
        CellValue::Number(v) => epoch_to_datetime(*v),
        CellValue::Text(s) => parse_datetime_str(s),
    }
}

fn epoch_to_datetime(v: f64) -> Option<DateTime<Utc>> {
    if !v.is_finite() || v < 1_000_000_000.0 {
        return None;
    }
    let secs = if v > 10_000_000_000.0 { v / 1000.0 } else { v };
    Utc.timestamp_opt(secs.trunc() as i64, 0).single()
}

fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return None;
    }

    if let Ok(epoch) = s.parse::<f64>() {
        return epoch_to_datetime(epoch);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

/// Calendar-month bucket key of a timestamp.
pub fn month_key(ts: &DateTime<Utc>) -> (i32, u32) {
    (ts.year(), ts.month())
}

// ============================================================================
// Sampling Interval
// ============================================================================

/// Median positive gap between consecutive valid timestamps, in hours.
///
/// Gaps are taken in record order; zero or negative gaps (duplicate or
/// interleaved multi-turbine stamps) are ignored. `None` when no positive
/// gap exists.
pub fn detect_sampling_interval(records: &[CanonicalRecord]) -> Option<f64> {
    let stamps: Vec<DateTime<Utc>> = records.iter().filter_map(|r| r.timestamp).collect();
    let mut gaps: Vec<f64> = stamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 3_600_000.0)
        .filter(|h| *h > 0.0)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = gaps.len() / 2;
    Some(if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) / 2.0
    } else {
        gaps[mid]
    })
}

/// Configured interval, else detected, else the fallback.
pub fn resolve_interval(config: &AnalysisConfig, records: &[CanonicalRecord]) -> SamplingInterval {
    if let Some(hours) = config.assumptions.sampling_interval_hours {
        return SamplingInterval {
            hours,
            source: IntervalSource::Configured,
        };
    }
    match detect_sampling_interval(records) {
        Some(hours) => SamplingInterval {
            hours,
            source: IntervalSource::Detected,
        },
        None => SamplingInterval {
            hours: config.assumptions.fallback_interval_hours,
            source: IntervalSource::Fallback,
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ColumnMapper;

    fn dataset(headers: &[&str], rows: Vec<Vec<CellValue>>) -> RawDataset {
        RawDataset::with_rows(headers.iter().map(|s| s.to_string()).collect(), rows)
    }

    fn normalize(ds: &RawDataset, config: &AnalysisConfig) -> Result<NormalizedDataset, AnalysisError> {
        let roles = ColumnMapper::new(config.mapping.positional_fallback).map(&ds.headers);
        Normalizer::new(config).normalize(ds, &roles)
    }

    #[test]
    fn test_row_count_preserved_with_bad_cells() {
        let ds = dataset(
            &["Time", "Power"],
            vec![
                vec!["2020-01-01 00:00:00".into(), 10.0.into()],
                vec!["not a date".into(), "oops".into()],
                vec![CellValue::Null, CellValue::Null],
            ],
        );
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.total_rows(), 3);
        assert_eq!(out.valid_timestamps(), 1);
        assert_eq!(out.records[1].power_kw, 0.0);
        assert_eq!(out.records[2].power_kw, 0.0);
        assert_eq!(out.quality.malformed_time, 2);
        assert_eq!(out.quality.malformed_power, 2);
        assert_eq!(out.malformed_samples.len(), 4);
    }

    #[test]
    fn test_negative_power_is_kept() {
        let ds = dataset(&["Time", "kW"], vec![vec!["2020-01-01".into(), (-5.0).into()]]);
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.records[0].power_kw, -5.0);
        assert_eq!(out.quality.malformed_power, 0);
    }

    #[test]
    fn test_defaults_for_absent_columns() {
        let ds = dataset(&["Time", "Power"], vec![vec!["2020-01-01".into(), 1.0.into()]]);
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        let r = &out.records[0];
        assert_eq!(r.wind_speed_ms, 0.0);
        assert_eq!(r.wind_direction_deg, None);
        assert_eq!(r.temperature_c, 20.0);
        assert_eq!(r.asset_id, "T01");
    }

    #[test]
    fn test_missing_time_is_fatal() {
        let ds = dataset(&["Power", "Wind Speed"], vec![]);
        let err = normalize(&ds, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingRequiredField { role: FieldRole::Time }));
    }

    #[test]
    fn test_numeric_asset_ids_render_as_text() {
        let ds = dataset(
            &["Time", "Power", "Turbine"],
            vec![vec!["2020-01-01".into(), 1.0.into(), 3.0.into()]],
        );
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.records[0].asset_id, "3");
    }

    #[test]
    fn test_unreadable_asset_ids_counted() {
        let ds = dataset(
            &["Time", "Power", "Turbine"],
            vec![
                vec!["2020-01-01 00:00".into(), 1.0.into(), "WTG02".into()],
                vec!["2020-01-01 00:10".into(), 1.0.into(), "n/a".into()],
                vec!["2020-01-01 00:20".into(), 1.0.into(), CellValue::Null],
                vec!["2020-01-01 00:30".into(), 1.0.into(), CellValue::Number(f64::NAN)],
            ],
        );
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.records[0].asset_id, "WTG02");
        assert!(out.records[1..].iter().all(|r| r.asset_id == "T01"));
        assert_eq!(out.quality.malformed_asset_id, 3);
        assert_eq!(out.quality.total(), 3);
        assert!(out.malformed_samples.iter().all(|m| m.role == FieldRole::AssetId));
    }

    #[test]
    fn test_absent_asset_column_is_not_malformed() {
        let ds = dataset(&["Time", "Power"], vec![vec!["2020-01-01".into(), 1.0.into()]]);
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.quality.malformed_asset_id, 0);
    }

    #[test]
    fn test_non_scalar_cells_take_defaults() {
        let ds: RawDataset = serde_json::from_str(
            r#"{"headers":["Time","Power","Wind Speed"],"rows":[["2020-01-01 00:00",true,{"v":3}]]}"#,
        )
        .unwrap();
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.total_rows(), 1);
        assert_eq!(out.records[0].power_kw, 0.0);
        assert_eq!(out.records[0].wind_speed_ms, 0.0);
        assert_eq!(out.quality.malformed_power, 1);
        assert_eq!(out.quality.malformed_wind_speed, 1);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 3, 4, 5, 6, 7).unwrap();
        for s in [
            "2020-03-04 05:06:07",
            "2020-03-04T05:06:07",
            "2020-03-04T05:06:07Z",
            "2020-03-04T05:06:07+00:00",
            "2020-03-04 05:06:07+00:00",
            "04/03/2020 05:06:07",
        ] {
            assert_eq!(parse_timestamp(&s.into()), Some(expected), "format {s}");
        }
        assert_eq!(
            parse_timestamp(&CellValue::Number(expected.timestamp() as f64)),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&CellValue::Number(expected.timestamp_millis() as f64)),
            Some(expected)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(&"yesterday".into()), None);
        assert_eq!(parse_timestamp(&CellValue::Number(42.0)), None);
        assert_eq!(parse_timestamp(&CellValue::Null), None);
    }

    #[test]
    fn test_detect_hourly_interval() {
        let rows: Vec<Vec<CellValue>> = (0..5)
            .map(|h| vec![format!("2020-01-01 0{h}:00:00").into(), 1.0.into()])
            .collect();
        let ds = dataset(&["Time", "Power"], rows);
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.interval.source, IntervalSource::Detected);
        assert!((out.interval.hours - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_interval_ignores_duplicate_stamps() {
        // Two turbines sharing each 10-minute stamp
        let rows: Vec<Vec<CellValue>> = ["00:00", "00:00", "00:10", "00:10", "00:20", "00:20"]
            .iter()
            .map(|t| vec![format!("2020-01-01 {t}").into(), 1.0.into()])
            .collect();
        let ds = dataset(&["Time", "Power"], rows);
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert!((out.interval.hours - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_configured_interval_wins() {
        let mut config = AnalysisConfig::default();
        config.assumptions.sampling_interval_hours = Some(0.5);
        let ds = dataset(
            &["Time", "Power"],
            vec![
                vec!["2020-01-01 00:00".into(), 1.0.into()],
                vec!["2020-01-01 01:00".into(), 1.0.into()],
            ],
        );
        let out = normalize(&ds, &config).unwrap();
        assert_eq!(out.interval, SamplingInterval { hours: 0.5, source: IntervalSource::Configured });
    }

    #[test]
    fn test_fallback_interval_without_timestamps() {
        let ds = dataset(&["Time", "Power"], vec![vec![CellValue::Null, 1.0.into()]]);
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.interval.source, IntervalSource::Fallback);
        assert!((out.interval.hours - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_dataset_normalizes() {
        let ds = dataset(&["Time", "Power"], vec![]);
        let out = normalize(&ds, &AnalysisConfig::default()).unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.quality, DataQuality::default());
    }
}
