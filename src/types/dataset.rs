//! Tabular SCADA input and its normalized form.
//!
//! A [`RawDataset`] is what an upload decoder hands to the core: one header
//! list plus rows of loosely-typed cells. Normalization turns each row into
//! exactly one [`CanonicalRecord`], preserving order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single raw cell as produced by a file decoder.
///
/// Untagged so that `null`, `12.5` and `"2020-01-01 00:00"` all deserialize
/// directly from JSON. Booleans, arrays and objects land in `Other` and
/// coerce to nothing, like any other malformed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl CellValue {
    /// Numeric view of the cell. Text is trimmed and parsed; NaN/Inf and
    /// placeholder strings yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Null | CellValue::Other(_) => None,
            CellValue::Number(v) => v.is_finite().then_some(*v),
            CellValue::Text(s) => {
                let s = s.trim();
                if is_placeholder(s) {
                    return None;
                }
                s.parse::<f64>().ok().filter(|v| v.is_finite())
            }
        }
    }

    /// Text view of the cell. Numbers are rendered without a trailing `.0`
    /// when integral so that `7` and `"7"` name the same asset.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null | CellValue::Other(_) => None,
            CellValue::Number(v) if !v.is_finite() => None,
            CellValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(format!("{}", *v as i64))
            }
            CellValue::Number(v) => Some(v.to_string()),
            CellValue::Text(s) => {
                let s = s.trim();
                (!is_placeholder(s)).then(|| s.to_string())
            }
        }
    }

    /// Short rendering used in malformed-value diagnostics.
    pub fn describe(&self) -> String {
        match self {
            CellValue::Null => "null".to_string(),
            CellValue::Number(v) => v.to_string(),
            CellValue::Text(s) => format!("'{s}'"),
            CellValue::Other(v) => v.to_string(),
        }
    }
}

fn is_placeholder(s: &str) -> bool {
    s.is_empty()
        || s == "-"
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("none")
        || s.eq_ignore_ascii_case("n/a")
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

static NULL_CELL: CellValue = CellValue::Null;

/// Header list plus rows of cells. Row `i`, column `j` belongs to header `j`.
///
/// Rows shorter than the header list are treated as having `null` in the
/// missing trailing positions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataset {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<CellValue>>,
}

impl RawDataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `column`), `Null` when the row is ragged.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL_CELL)
    }

    /// One row viewed as an ordered header → cell mapping.
    pub fn record(&self, row: usize) -> Vec<(&str, &CellValue)> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| (header.as_str(), self.cell(row, col)))
            .collect()
    }
}

/// One normalized observation.
///
/// `timestamp` is `None` when the time cell failed to parse; such records
/// still count toward row-based statistics (availability) but are left out
/// of temporal aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub timestamp: Option<DateTime<Utc>>,
    /// Active power in kW. Non-numeric input is recorded as 0.0.
    pub power_kw: f64,
    pub wind_speed_ms: f64,
    pub wind_direction_deg: Option<f64>,
    pub temperature_c: f64,
    pub asset_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_numeric_coercion() {
        assert_eq!(CellValue::Number(12.5).as_f64(), Some(12.5));
        assert_eq!(CellValue::from(" 3.25 ").as_f64(), Some(3.25));
        assert_eq!(CellValue::from("NaN").as_f64(), None);
        assert_eq!(CellValue::from("n/a").as_f64(), None);
        assert_eq!(CellValue::from("abc").as_f64(), None);
        assert_eq!(CellValue::Number(f64::INFINITY).as_f64(), None);
        assert_eq!(CellValue::Null.as_f64(), None);
    }

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(CellValue::Number(7.0).as_text().as_deref(), Some("7"));
        assert_eq!(CellValue::Number(7.5).as_text().as_deref(), Some("7.5"));
        assert_eq!(CellValue::from("  WTG-02 ").as_text().as_deref(), Some("WTG-02"));
        assert_eq!(CellValue::from("").as_text(), None);
    }

    #[test]
    fn test_untagged_json_cells() {
        let json = r#"{"headers":["Time","Power"],"rows":[["2020-01-01 00:00",12.0],[null,"bad"]]}"#;
        let ds: RawDataset = serde_json::from_str(json).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.cell(0, 1), &CellValue::Number(12.0));
        assert_eq!(ds.cell(1, 0), &CellValue::Null);
        assert_eq!(ds.cell(1, 1), &CellValue::Text("bad".to_string()));
    }

    #[test]
    fn test_non_scalar_json_cells_are_kept_as_other() {
        let json = r#"{"headers":["Time","Power","Turbine"],"rows":[[true,[1,2],{"id":"A"}]]}"#;
        let ds: RawDataset = serde_json::from_str(json).unwrap();
        assert_eq!(ds.row_count(), 1);
        assert_eq!(ds.cell(0, 0), &CellValue::Other(serde_json::Value::Bool(true)));
        for col in 0..3 {
            assert!(matches!(ds.cell(0, col), CellValue::Other(_)), "column {col}");
            assert_eq!(ds.cell(0, col).as_f64(), None);
            assert_eq!(ds.cell(0, col).as_text(), None);
        }
        assert_eq!(ds.cell(0, 1).describe(), "[1,2]");
    }

    #[test]
    fn test_ragged_rows_read_as_null() {
        let ds = RawDataset::with_rows(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Number(1.0)]],
        );
        assert_eq!(ds.cell(0, 1), &CellValue::Null);
        let rec = ds.record(0);
        assert_eq!(rec.len(), 2);
        assert_eq!(rec[1].0, "b");
    }
}
