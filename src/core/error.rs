//! Error taxonomy for valuation sources and the estimation model.

use thiserror::Error;

/// Failure modes of a single upstream valuation source.
///
/// These are absorbed inside the resolver and never reach the scheduler
/// as errors; they only decide whether fallback is attempted.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network failure, timeout or non-200 response.
    #[error("source unavailable for {code}: {reason}")]
    Unavailable { code: String, reason: String },

    /// Response body did not match the expected shape.
    #[error("failed to parse response for {code}: {reason}")]
    Parse { code: String, reason: String },
}

impl SourceError {
    pub fn unavailable(code: &str, reason: impl ToString) -> Self {
        Self::Unavailable {
            code: code.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(code: &str, reason: impl ToString) -> Self {
        Self::Parse {
            code: code.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Failure modes of the estimation model and backtester.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EstimateError {
    /// Too few historical points to produce a forecast or run a backtest.
    #[error("insufficient history: have {have} points, need at least {need}")]
    InsufficientHistory { have: usize, need: usize },
}
