//! Analysis pipeline: the single entry point of the crate.
//!
//! ```text
//! RawDataset ─▶ ColumnMapper ─▶ Normalizer ─▶ ReferenceSource
//!                                    │              │
//!                                    ▼              ▼
//!                           MonteCarloEstimator ◀───┘
//!                                    │
//!                                    ▼
//!                            ReportAggregator ─▶ Report
//! ```
//!
//! Fatal problems (unmapped `time`/`power`, bad simulation parameters,
//! cancellation) abort before any aggregate is built. The caller receives
//! either a complete [`Report`] or one [`AnalysisError`].

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::validation::validate_physical_ranges;
use crate::config::AnalysisConfig;
use crate::estimator::{MonteCarloEstimator, SimulationParams};
use crate::mapping::ColumnMapper;
use crate::normalize::{Normalizer, ReferenceSource, SyntheticReference};
use crate::report::ReportAggregator;
use crate::types::{AnalysisError, RawDataset, Report};

/// Per-request overrides layered on a clone of the loaded config.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisOverrides {
    pub num_sim: Option<usize>,
    pub meter_uncertainty: Option<f64>,
    pub loss_uncertainty: Option<f64>,
    pub sampling_interval_hours: Option<f64>,
}

impl AnalysisOverrides {
    pub fn apply(&self, config: &AnalysisConfig) -> AnalysisConfig {
        let mut merged = config.clone();
        if let Some(n) = self.num_sim {
            merged.simulation.num_sim = n;
        }
        if let Some(u) = self.meter_uncertainty {
            merged.simulation.meter_uncertainty = u;
        }
        if let Some(u) = self.loss_uncertainty {
            merged.simulation.loss_uncertainty = u;
        }
        if let Some(h) = self.sampling_interval_hours {
            merged.assumptions.sampling_interval_hours = Some(h);
        }
        merged
    }
}

/// Runs analyses with one configuration and a shared cancellation token.
pub struct Analyzer {
    config: AnalysisConfig,
    cancel: CancellationToken,
    reference: Box<dyn ReferenceSource>,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let reference = Box::new(SyntheticReference::new(config.assumptions.air_density));
        Self {
            config,
            cancel: CancellationToken::new(),
            reference,
        }
    }

    /// Use an externally owned token, e.g. one cancelled by a timeout.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Substitute the reference series builder.
    pub fn with_reference_source(mut self, reference: Box<dyn ReferenceSource>) -> Self {
        self.reference = reference;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn analyze(&self, dataset: &RawDataset, expected_aep: Option<f64>) -> Result<Report, AnalysisError> {
        let config = &self.config;
        info!(
            columns = dataset.headers.len(),
            rows = dataset.row_count(),
            "Starting wind plant analysis"
        );

        let params = validate_request(config)?;

        let roles = ColumnMapper::new(config.mapping.positional_fallback).map(&dataset.headers);
        roles.ensure_required()?;

        let normalized = Normalizer::new(config).normalize(dataset, &roles)?;
        let reference = self.reference.build(&normalized.records);

        let distribution = MonteCarloEstimator::new(params).estimate(&normalized, &reference, &self.cancel)?;

        Ok(ReportAggregator::new(config).aggregate(&normalized, &distribution, expected_aep))
    }
}

/// Range-check a merged request config. Overrides and programmatic configs
/// never pass through file loading, so this is their only gate.
fn validate_request(config: &AnalysisConfig) -> Result<SimulationParams, AnalysisError> {
    let params = SimulationParams::from_config(config);
    let mut problems = params.problems();
    let (range_errors, _) = validate_physical_ranges(config);
    problems.extend(range_errors);
    if !problems.is_empty() {
        return Err(AnalysisError::SimulationConfig(problems.join("; ")));
    }
    params.validate()?;
    Ok(params)
}

/// Analyze `dataset` with `config`. No cancellation.
pub fn analyze(
    dataset: &RawDataset,
    expected_aep: Option<f64>,
    config: &AnalysisConfig,
) -> Result<Report, AnalysisError> {
    Analyzer::new(config.clone()).analyze(dataset, expected_aep)
}
