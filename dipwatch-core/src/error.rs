//! Pipeline error kinds.
//!
//! Every variant here is fatal to an evaluation run: the pipeline stops and
//! no signal table is produced. Delivery failures are not pipeline errors
//! and live with the mail transports in `dipwatch-runner`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    /// The raw table cannot yield a usable close series.
    #[error("data unavailable: {reason} (columns: [{}], rows: {rows})", columns.join(", "))]
    DataUnavailable {
        reason: String,
        columns: Vec<String>,
        rows: usize,
    },

    #[error("indicator '{indicator}' failed: {reason}")]
    IndicatorComputation { indicator: String, reason: String },

    /// Post-computation guard: a series the evaluator depends on was never produced.
    #[error("missing indicator series: {}", missing.join(", "))]
    MissingIndicatorColumns { missing: Vec<String> },

    #[error("invalid strategy parameters: {0}")]
    InvalidStrategy(String),
}

impl SignalError {
    pub(crate) fn unavailable(reason: impl Into<String>, columns: &[String], rows: usize) -> Self {
        SignalError::DataUnavailable {
            reason: reason.into(),
            columns: columns.to_vec(),
            rows,
        }
    }

    /// Short machine-friendly name of the error kind, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalError::DataUnavailable { .. } => "data_unavailable",
            SignalError::IndicatorComputation { .. } => "indicator_computation",
            SignalError::MissingIndicatorColumns { .. } => "missing_indicator_columns",
            SignalError::InvalidStrategy(_) => "invalid_strategy",
        }
    }
}
