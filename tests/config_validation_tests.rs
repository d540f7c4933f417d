//! Config Validation Tests
//!
//! Typo detection and range validation for `windaep.toml`, exercised through
//! the public config API and real files on disk.

use windaep::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use windaep::config::{AnalysisConfig, ConfigError};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_simulation_key_warns_with_suggestion() {
    let toml_str = r#"
[simulation]
num_sims = 500
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("simulation.num_sim"),
        "Should suggest the correct spelling"
    );
    assert!(warnings[0].to_string().contains("did you mean"));
}

#[test]
fn typo_in_assumptions_warns() {
    let warnings = validate_unknown_keys("[assumptions]\nwake_los = 0.1\n");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("assumptions.wake_loss"));
}

#[test]
fn typo_does_not_block_loading() {
    let config = AnalysisConfig::from_toml_str("[simulation]\nnum_sim = 20\nsede = 3\n")
        .expect("unknown keys only warn");
    assert_eq!(config.simulation.num_sim, 20);
    assert_eq!(config.simulation.seed, 42, "misspelt seed leaves the default");
}

#[test]
fn every_known_key_is_accepted() {
    let defaults = AnalysisConfig::default();
    let mut full = defaults.clone();
    full.assumptions.sampling_interval_hours = Some(1.0);
    let toml_str = full.to_toml().expect("serialize");
    assert!(validate_unknown_keys(&toml_str).is_empty(), "{toml_str}");

    let value: toml::Value = toml_str.parse().unwrap();
    let known = known_config_keys();
    for key in windaep::config::validation::walk_toml_keys(&value, "") {
        assert!(known.contains(key.as_str()), "serialized key '{key}' missing from known set");
    }
}

#[test]
fn far_off_key_gets_no_suggestion() {
    assert!(suggest_correction("completely_unrelated_setting", &known_config_keys()).is_none());
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn negative_loss_rejected() {
    let mut config = AnalysisConfig::default();
    config.assumptions.electrical_loss = -0.01;
    let (errors, _) = validate_physical_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("electrical_loss")), "{errors:?}");
}

#[test]
fn empty_asset_id_rejected() {
    let mut config = AnalysisConfig::default();
    config.assumptions.default_asset_id = "  ".to_string();
    let (errors, _) = validate_physical_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("default_asset_id")));
}

#[test]
fn long_interval_warns_but_passes() {
    let mut config = AnalysisConfig::default();
    config.assumptions.sampling_interval_hours = Some(48.0);
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "assumptions.sampling_interval_hours"));
    assert!(config.validate().is_ok());
}

#[test]
fn validation_collects_every_error() {
    let toml_str = r#"
[simulation]
num_sim = 0
meter_uncertainty = 2.0

[assumptions]
air_density = -1.0
"#;
    match AnalysisConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 3, "{errors:?}");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

// ============================================================================
// Files on Disk
// ============================================================================

#[test]
fn load_from_file_applies_all_sections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("windaep.toml");
    std::fs::write(
        &path,
        r#"
[simulation]
num_sim = 64
seed = 9

[assumptions]
wake_loss = 0.08
default_asset_id = "WTG-A"

[mapping]
positional_fallback = true
"#,
    )
    .unwrap();

    let config = AnalysisConfig::load_from_file(&path).unwrap();
    assert_eq!(config.simulation.num_sim, 64);
    assert_eq!(config.simulation.seed, 9);
    assert_eq!(config.assumptions.wake_loss, 0.08);
    assert_eq!(config.assumptions.default_asset_id, "WTG-A");
    assert!(config.mapping.positional_fallback);
    // Untouched values keep their defaults
    assert_eq!(config.assumptions.electrical_loss, 0.02);
}

#[test]
fn malformed_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[simulation\nnum_sim = ").unwrap();
    let err = AnalysisConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)));
    assert!(err.to_string().contains("broken.toml"), "{err}");
}

#[test]
fn invalid_values_in_file_fail_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("windaep.toml");
    std::fs::write(&path, "[assumptions]\nfallback_interval_hours = 0.0\n").unwrap();
    let err = AnalysisConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)), "{err}");
}
