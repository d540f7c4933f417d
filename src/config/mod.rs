//! Analysis Configuration Module
//!
//! Replaces embedded constants with one explicit configuration struct that
//! is passed through the pipeline, so tests can override any assumption.
//!
//! ## Loading Order
//!
//! 1. `WINDAEP_CONFIG` environment variable (path to TOML file)
//! 2. `windaep.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! ```ignore
//! let config = AnalysisConfig::load();
//! let report = windaep::analyze(&dataset, None, &config)?;
//! ```

mod analysis_config;
pub mod defaults;
pub mod validation;

pub use analysis_config::*;
