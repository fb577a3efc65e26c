//! Error types for the claims-ratio dashboard

use thiserror::Error;

use crate::forecast::FittedModel;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient data: need at least {required} monthly observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// The optimizer gave up; the best-effort model is attached so callers
    /// can keep serving it in a degraded state.
    #[error(
        "Model did not converge after {} iterations (css={:.6})",
        .0.diagnostics().iterations,
        .0.diagnostics().css
    )]
    NonConvergence(Box<FittedModel>),

    #[error("Model not fitted: call fit before forecasting")]
    ModelNotFitted,

    #[error("Model already fitted")]
    AlreadyFitted,

    #[error("Invalid horizon: {0} (must be a non-negative number of months within calendar range)")]
    InvalidHorizon(i64),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Invalid model spec: {0}")]
    InvalidSpec(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Caller mistakes: bad input that retrying will not fix
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::InvalidHorizon(_)
                | Self::InvalidSeries(_)
                | Self::InvalidSpec(_)
                | Self::InvalidFilter(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
