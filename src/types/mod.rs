//! Shared data structures for the SCADA-to-AEP pipeline
//!
//! - `dataset`: raw tabular input and the canonical per-row record
//! - `report`: the performance report handed back to the caller
//! - `error`: fatal error taxonomy

mod dataset;
mod error;
mod report;

pub use dataset::*;
pub use error::*;
pub use report::*;
