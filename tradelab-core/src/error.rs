//! The typed failure of a backtest run.
//!
//! A run either produces a fully populated result or one of these; callers can
//! always tell "ran with zero trades" from "did not run".

use crate::config::ConfigError;
use crate::domain::SeriesError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("insufficient data: strategy needs at least {required} bars, series has {available}")]
    InsufficientData { required: usize, available: usize },
    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] SeriesError),
}

impl BacktestError {
    /// Short, stable identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BacktestError::Configuration(_) => "configuration_error",
            BacktestError::InsufficientData { .. } => "insufficient_data",
            BacktestError::DataIntegrity(_) => "data_integrity_error",
        }
    }
}
