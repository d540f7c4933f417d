//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks on plant assumptions.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::AnalysisConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for AnalysisConfig.
///
/// Any new field added to AnalysisConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [simulation]
        "simulation",
        "simulation.num_sim",
        "simulation.meter_uncertainty",
        "simulation.loss_uncertainty",
        "simulation.seed",
        "simulation.timeout_secs",
        // [assumptions]
        "assumptions",
        "assumptions.air_density",
        "assumptions.wake_loss",
        "assumptions.electrical_loss",
        "assumptions.default_temperature_c",
        "assumptions.default_asset_id",
        "assumptions.sampling_interval_hours",
        "assumptions.fallback_interval_hours",
        // [mapping]
        "mapping",
        "mapping.positional_fallback",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        // Tie-break on the key itself so HashSet order never leaks into output
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate ranges on a parsed AnalysisConfig.
///
/// Returns (errors, warnings): errors are impossible values that must stop
/// the run; warnings are suspicious but usable.
pub fn validate_physical_ranges(config: &AnalysisConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let a = &config.assumptions;

    for (name, value) in [
        ("assumptions.wake_loss", a.wake_loss),
        ("assumptions.electrical_loss", a.electrical_loss),
    ] {
        if !value.is_finite() || !(0.0..1.0).contains(&value) {
            errors.push(format!("{name} = {value} must be in [0, 1)"));
        }
    }

    if !a.air_density.is_finite() || a.air_density <= 0.0 {
        errors.push(format!(
            "assumptions.air_density = {} must be > 0",
            a.air_density
        ));
    } else if !(1.0..=1.4).contains(&a.air_density) {
        // Sea-level air sits near 1.225; outside 1.0-1.4 is very unusual
        warnings.push(ValidationWarning {
            field: "assumptions.air_density".to_string(),
            message: format!(
                "air_density = {:.3} is outside typical range (1.0-1.4 kg/m³)",
                a.air_density
            ),
            suggestion: None,
        });
    }

    if !a.fallback_interval_hours.is_finite() || a.fallback_interval_hours <= 0.0 {
        errors.push(format!(
            "assumptions.fallback_interval_hours = {} must be > 0 (used as energy multiplier)",
            a.fallback_interval_hours
        ));
    }

    if let Some(h) = a.sampling_interval_hours {
        if !h.is_finite() || h <= 0.0 {
            errors.push(format!(
                "assumptions.sampling_interval_hours = {h} must be > 0"
            ));
        } else if h > 24.0 {
            warnings.push(ValidationWarning {
                field: "assumptions.sampling_interval_hours".to_string(),
                message: format!("sampling_interval_hours = {h:.2} is longer than one day"),
                suggestion: None,
            });
        }
    }

    if !a.default_temperature_c.is_finite() {
        errors.push("assumptions.default_temperature_c must be a finite number".to_string());
    } else if !(-60.0..=60.0).contains(&a.default_temperature_c) {
        warnings.push(ValidationWarning {
            field: "assumptions.default_temperature_c".to_string(),
            message: format!(
                "default_temperature_c = {:.1} is outside typical range (-60 to 60 °C)",
                a.default_temperature_c
            ),
            suggestion: None,
        });
    }

    if a.default_asset_id.trim().is_empty() {
        errors.push("assumptions.default_asset_id must not be empty".to_string());
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
