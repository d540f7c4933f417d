//! Pipeline error taxonomy.

use serde::Serialize;
use thiserror::Error;

use crate::mapping::FieldRole;

/// Fatal analysis failure. The caller receives either a complete report or
/// exactly one of these.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Required field '{role}' could not be resolved from the dataset headers")]
    MissingRequiredField { role: FieldRole },

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Invalid simulation configuration: {0}")]
    SimulationConfig(String),

    #[error("Analysis cancelled before the simulation completed")]
    Cancelled,
}

/// Machine-usable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingRequiredField,
    UnsupportedInput,
    SimulationConfig,
    Cancelled,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            AnalysisError::UnsupportedInput(_) => ErrorKind::UnsupportedInput,
            AnalysisError::SimulationConfig(_) => ErrorKind::SimulationConfig,
            AnalysisError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// True when the failure is caused by the submitted input or parameters
    /// (a 400-class response), false for internal/runtime failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AnalysisError::Cancelled)
    }
}

/// Serializable error body: `{ "status": "error", "kind": ..., "message": ... }`
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub status: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AnalysisError> for ErrorReport {
    fn from(err: &AnalysisError) -> Self {
        Self {
            status: "error",
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
