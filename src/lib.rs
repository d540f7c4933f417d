//! windaep: Wind Plant SCADA-to-AEP Analysis
//!
//! Turns raw turbine SCADA tables with arbitrary column layouts into a
//! standardized performance report: annual energy production with Monte
//! Carlo uncertainty, monthly energy, binned power curve and turbine ranking.
//!
//! ## Architecture
//!
//! - **Column Mapper** (`mapping`): keyword rule table mapping headers to roles
//! - **Dataset Normalizer** (`normalize`): coercion, timestamps, sampling
//!   interval and the synthetic monthly reference series
//! - **Monte Carlo AEP Estimator** (`estimator`): seeded parallel trials
//! - **Report Aggregator** (`report`): monthly, power curve, ranking, KPIs
//!
//! ## Usage
//!
//! ```ignore
//! let config = windaep::AnalysisConfig::load();
//! let dataset: windaep::RawDataset = serde_json::from_str(&json)?;
//! let report = windaep::analyze(&dataset, Some(12.5), &config)?;
//! ```

pub mod config;
pub mod estimator;
pub mod mapping;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod types;

pub use config::{AnalysisConfig, ConfigError};
pub use estimator::{AepDistribution, AepSummary, MonteCarloEstimator, SimulationParams, TrialOutcome};
pub use mapping::{ColumnMapper, FieldRole, FieldRoleMap, RoleDetector};
pub use normalize::{NormalizedDataset, Normalizer, ReferenceSeries, ReferenceSource, SyntheticReference};
pub use pipeline::{analyze, AnalysisOverrides, Analyzer};
pub use types::{
    AnalysisError, CanonicalRecord, CellValue, ErrorKind, ErrorReport, RawDataset, Report,
    ReportSummary,
};
