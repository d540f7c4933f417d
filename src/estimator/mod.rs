//! Monte Carlo AEP Estimator
//!
//! Turns the baseline delivered energy of a [`NormalizedDataset`] into a
//! distribution of annual energy estimates by perturbing the two unmeasured
//! quantities: revenue-meter error and total plant loss.
//!
//! ## Trial model
//!
//! ```text
//! baseline_kwh  = Σ power_kw × Δt_hours           (all rows)
//! meter         ~ Normal(1, meter_uncertainty)
//! loss          ~ Normal(nominal_loss, loss_uncertainty), clamped to [0, 0.99]
//! trial net AEP = baseline_kwh × meter / 1e6      (GWh)
//! ```
//!
//! Trial `i` owns an RNG seeded from `(seed, i)`, so the distribution is
//! identical whatever the rayon thread count. A single trial uses the
//! nominal values and draws nothing.
//!
//! ## Usage
//!
//! ```ignore
//! let params = SimulationParams::from_config(&config);
//! let dist = MonteCarloEstimator::new(params).estimate(&normalized, &reference, &cancel)?;
//! let summary = dist.summary();
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{defaults, AnalysisConfig};
use crate::normalize::{NormalizedDataset, ReferenceSeries};
use crate::types::AnalysisError;

// ============================================================================
// Parameters
// ============================================================================

/// Inputs of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub num_sim: usize,
    pub meter_uncertainty: f64,
    pub loss_uncertainty: f64,
    /// Centre of the loss-fraction draw.
    pub nominal_loss: f64,
    pub seed: u64,
}

impl SimulationParams {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            num_sim: config.simulation.num_sim,
            meter_uncertainty: config.simulation.meter_uncertainty,
            loss_uncertainty: config.simulation.loss_uncertainty,
            nominal_loss: config.nominal_loss_fraction(),
            seed: config.simulation.seed,
        }
    }

    /// Every rule the user-facing parameters break, one message each.
    ///
    /// Config validation reports these alongside its own range checks.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.num_sim < 1 {
            problems.push(format!("simulation.num_sim must be >= 1 (got {})", self.num_sim));
        }
        for (name, value) in [
            ("simulation.meter_uncertainty", self.meter_uncertainty),
            ("simulation.loss_uncertainty", self.loss_uncertainty),
        ] {
            check_unit_interval(name, value, &mut problems);
        }
        problems
    }

    /// Reject parameters no trial can run with.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let mut problems = self.problems();
        check_unit_interval("nominal loss fraction", self.nominal_loss, &mut problems);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::SimulationConfig(problems.join("; ")))
        }
    }

    /// Per-trial seed. Adjacent trials get well-separated streams.
    fn trial_seed(&self, trial: usize) -> u64 {
        self.seed ^ (trial as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }
}

fn check_unit_interval(name: &str, value: f64, problems: &mut Vec<String>) {
    // NaN comparisons silently pass, so test finiteness first
    if !value.is_finite() {
        problems.push(format!("{name} must be a finite number (got {value})"));
    } else if !(0.0..1.0).contains(&value) {
        problems.push(format!("{name} must be in [0, 1) (got {value})"));
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

// ============================================================================
// Distribution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialOutcome {
    pub aep_gwh: f64,
    pub total_loss_fraction: f64,
}

/// Ordered trial outcomes plus the inputs they were derived from.
#[derive(Debug, Clone, Serialize)]
pub struct AepDistribution {
    pub trials: Vec<TrialOutcome>,
    pub baseline_energy_kwh: f64,
    pub interval_hours: f64,
    pub reference_periods: usize,
}

/// Reduction of an [`AepDistribution`]. All energies in GWh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AepSummary {
    pub net_aep: f64,
    /// `net_aep / (1 - mean loss fraction)`
    pub gross_aep: f64,
    pub net_aep_std: f64,
    /// `net_aep_std / net_aep`, 0 when net AEP is 0.
    pub uncertainty: f64,
    pub p50: f64,
    /// Value exceeded in 90% of trials.
    pub p90: f64,
    pub mean_loss_fraction: f64,
}

impl AepDistribution {
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn net_values(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.aep_gwh).collect()
    }

    pub fn summary(&self) -> AepSummary {
        if self.trials.is_empty() {
            return AepSummary::default();
        }
        let net = self.net_values();
        let net_aep = net.iter().mean();
        let mean_loss_fraction = self.trials.iter().map(|t| t.total_loss_fraction).mean();

        let net_aep_std = if net.len() < 2 {
            0.0
        } else {
            let sd = net.iter().std_dev();
            if sd.is_finite() { sd } else { 0.0 }
        };
        let uncertainty = if net_aep.abs() > f64::EPSILON {
            net_aep_std / net_aep.abs()
        } else {
            0.0
        };

        let mut data = Data::new(net);
        let p50 = data.percentile(50);
        let p90 = data.percentile(10);

        AepSummary {
            net_aep,
            gross_aep: net_aep / (1.0 - mean_loss_fraction),
            net_aep_std,
            uncertainty,
            p50,
            p90,
            mean_loss_fraction,
        }
    }
}

// ============================================================================
// Estimator
// ============================================================================

pub struct MonteCarloEstimator {
    params: SimulationParams,
}

impl MonteCarloEstimator {
    pub fn new(params: SimulationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Run all trials. A cancelled run is discarded whole.
    pub fn estimate(
        &self,
        dataset: &NormalizedDataset,
        reference: &ReferenceSeries,
        cancel: &CancellationToken,
    ) -> Result<AepDistribution, AnalysisError> {
        self.params.validate()?;

        let interval_hours = dataset.interval.hours;
        let baseline_energy_kwh = baseline_energy_kwh(dataset);
        info!(
            num_sim = self.params.num_sim,
            baseline_kwh = format!("{baseline_energy_kwh:.1}"),
            interval_hours = format!("{interval_hours:.4}"),
            nominal_loss = format!("{:.4}", self.params.nominal_loss),
            "Starting Monte Carlo AEP simulation"
        );
        if let Some(ws) = reference.mean_wind_speed() {
            debug!(periods = reference.len(), mean_wind_speed = format!("{ws:.2}"), "Reference series");
        }

        let trials = if self.params.num_sim == 1 {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            vec![self.nominal_trial(baseline_energy_kwh)]
        } else {
            self.run_trials(baseline_energy_kwh, cancel)?
        };

        let distribution = AepDistribution {
            trials,
            baseline_energy_kwh,
            interval_hours,
            reference_periods: reference.len(),
        };
        info!(trials = distribution.len(), "Monte Carlo simulation complete");
        Ok(distribution)
    }

    fn nominal_trial(&self, baseline_kwh: f64) -> TrialOutcome {
        TrialOutcome {
            aep_gwh: baseline_kwh / defaults::KWH_PER_GWH,
            total_loss_fraction: self.params.nominal_loss,
        }
    }

    fn run_trials(
        &self,
        baseline_kwh: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TrialOutcome>, AnalysisError> {
        let p = &self.params;
        let meter = Normal::new(1.0, p.meter_uncertainty)
            .map_err(|e| AnalysisError::SimulationConfig(format!("meter_uncertainty: {e}")))?;
        let loss = Normal::new(p.nominal_loss, p.loss_uncertainty)
            .map_err(|e| AnalysisError::SimulationConfig(format!("loss_uncertainty: {e}")))?;

        let trials: Option<Vec<TrialOutcome>> = (0..p.num_sim)
            .into_par_iter()
            .map(|i| {
                if i % defaults::CANCELLATION_CHECK_STRIDE == 0 && cancel.is_cancelled() {
                    return None;
                }
                let mut rng = StdRng::seed_from_u64(p.trial_seed(i));
                let meter_multiplier = meter.sample(&mut rng);
                let total_loss_fraction = loss.sample(&mut rng).clamp(0.0, defaults::MAX_LOSS_FRACTION);
                Some(TrialOutcome {
                    aep_gwh: baseline_kwh * meter_multiplier / defaults::KWH_PER_GWH,
                    total_loss_fraction,
                })
            })
            .collect();

        match trials {
            Some(t) if !cancel.is_cancelled() => Ok(t),
            _ => {
                info!("Monte Carlo simulation cancelled, discarding trials");
                Err(AnalysisError::Cancelled)
            }
        }
    }
}

/// Σ power × Δt over every record, in kWh.
pub fn baseline_energy_kwh(dataset: &NormalizedDataset) -> f64 {
    let dt = dataset.interval.hours;
    dataset.records.iter().map(|r| r.power_kw * dt).sum()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{IntervalSource, SamplingInterval};
    use crate::types::{CanonicalRecord, DataQuality};

    fn hourly(n: usize, power_kw: f64) -> NormalizedDataset {
        let records = (0..n)
            .map(|_| CanonicalRecord {
                timestamp: None,
                power_kw,
                wind_speed_ms: 10.0,
                wind_direction_deg: None,
                temperature_c: 20.0,
                asset_id: "T01".to_string(),
            })
            .collect();
        NormalizedDataset {
            records,
            quality: DataQuality::default(),
            malformed_samples: Vec::new(),
            interval: SamplingInterval { hours: 1.0, source: IntervalSource::Configured },
        }
    }

    fn params(num_sim: usize, meter_u: f64, loss_u: f64) -> SimulationParams {
        SimulationParams {
            num_sim,
            meter_uncertainty: meter_u,
            loss_uncertainty: loss_u,
            ..SimulationParams::default()
        }
    }

    fn run(p: SimulationParams, ds: &NormalizedDataset) -> Result<AepDistribution, AnalysisError> {
        MonteCarloEstimator::new(p).estimate(ds, &ReferenceSeries::default(), &CancellationToken::new())
    }

    #[test]
    fn test_single_trial_is_nominal() {
        let ds = hourly(100, 100.0);
        let dist = run(params(1, 0.5, 0.5), &ds).unwrap();
        assert_eq!(dist.len(), 1);
        let s = dist.summary();
        assert!((s.net_aep - 0.01).abs() < 1e-12, "net_aep = {}", s.net_aep);
        let nominal = AnalysisConfig::default().nominal_loss_fraction();
        assert!((s.gross_aep - 0.01 / (1.0 - nominal)).abs() < 1e-12);
        assert_eq!(s.net_aep_std, 0.0);
    }

    #[test]
    fn test_single_trial_deterministic() {
        let ds = hourly(24, 1500.0);
        let a = run(params(1, 0.1, 0.1), &ds).unwrap().summary();
        let b = run(params(1, 0.1, 0.1), &ds).unwrap().summary();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_uncertainty_collapses_to_point_estimate() {
        let ds = hourly(50, 321.0);
        let point = run(params(1, 0.0, 0.0), &ds).unwrap().summary();
        let many = run(params(200, 0.0, 0.0), &ds).unwrap().summary();
        assert!(many.net_aep_std.abs() < 1e-12, "std = {}", many.net_aep_std);
        assert!((many.net_aep - point.net_aep).abs() < 1e-12);
        assert!((many.gross_aep - point.gross_aep).abs() < 1e-12);
    }

    #[test]
    fn test_same_seed_reproducible() {
        let ds = hourly(10, 2000.0);
        let a = run(params(500, 0.01, 0.05), &ds).unwrap();
        let b = run(params(500, 0.01, 0.05), &ds).unwrap();
        assert_eq!(a.trials, b.trials);
    }

    #[test]
    fn test_different_seed_differs() {
        let ds = hourly(10, 2000.0);
        let a = run(params(100, 0.01, 0.05), &ds).unwrap();
        let b = run(SimulationParams { seed: 7, ..params(100, 0.01, 0.05) }, &ds).unwrap();
        assert_ne!(a.trials, b.trials);
    }

    #[test]
    fn test_spread_and_percentiles() {
        let ds = hourly(100, 100.0);
        let s = run(params(2000, 0.05, 0.05), &ds).unwrap().summary();
        assert!(s.net_aep_std > 0.0);
        assert!(s.p90 < s.p50, "P90 {} must be below P50 {}", s.p90, s.p50);
        assert!((s.net_aep - 0.01).abs() < 0.001);
        assert!((s.uncertainty - 0.05).abs() < 0.01, "uncertainty {}", s.uncertainty);
    }

    #[test]
    fn test_loss_draws_clamped() {
        let ds = hourly(1, 1.0);
        let dist = run(params(500, 0.0, 0.9), &ds).unwrap();
        assert!(dist
            .trials
            .iter()
            .all(|t| (0.0..=defaults::MAX_LOSS_FRACTION).contains(&t.total_loss_fraction)));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let ds = hourly(1, 1.0);
        for p in [params(0, 0.0, 0.0), params(10, 1.0, 0.0), params(10, 0.0, -0.1), params(10, f64::NAN, 0.0)] {
            let err = run(p.clone(), &ds).unwrap_err();
            assert!(matches!(err, AnalysisError::SimulationConfig(_)), "{p:?} gave {err:?}");
        }
    }

    #[test]
    fn test_cancelled_run_discarded() {
        let ds = hourly(10, 100.0);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = MonteCarloEstimator::new(params(1000, 0.01, 0.01))
            .estimate(&ds, &ReferenceSeries::default(), &cancel)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
    }

    #[test]
    fn test_cancel_during_run_discards_trials() {
        let ds = hourly(10, 100.0);
        let estimator = MonteCarloEstimator::new(params(10_000_000, 0.01, 0.01));
        let cancel = CancellationToken::new();

        let result = std::thread::scope(|s| {
            let canceller = cancel.clone();
            s.spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(1));
                canceller.cancel();
            });
            estimator.estimate(&ds, &ReferenceSeries::default(), &cancel)
        });
        assert!(matches!(result, Err(AnalysisError::Cancelled)), "{:?}", result.map(|d| d.len()));

        // The estimator holds no state from the aborted run
        let fresh = MonteCarloEstimator::new(params(100, 0.01, 0.01))
            .estimate(&ds, &ReferenceSeries::default(), &CancellationToken::new())
            .unwrap();
        assert_eq!(fresh.len(), 100);
    }

    #[test]
    fn test_invalid_params_report_every_problem() {
        let err = params(0, 2.0, f64::NAN).validate().unwrap_err();
        let AnalysisError::SimulationConfig(message) = err else {
            panic!("expected SimulationConfig");
        };
        assert!(message.contains("num_sim"), "{message}");
        assert!(message.contains("meter_uncertainty"), "{message}");
        assert!(message.contains("loss_uncertainty"), "{message}");
        assert_eq!(params(0, 2.0, f64::NAN).problems().len(), 3);
    }

    #[test]
    fn test_empty_dataset_zero_aep() {
        let ds = hourly(0, 0.0);
        let s = run(params(10, 0.01, 0.01), &ds).unwrap().summary();
        assert_eq!(s.net_aep, 0.0);
        assert_eq!(s.uncertainty, 0.0);
    }
}
