use thiserror::Error;

/// Per-product forecasting failure.
///
/// Recoverable: callers degrade the product instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("model fitting failed: {0}")]
    ModelFit(String),

    #[error("invalid forecast input: {0}")]
    InvalidInput(String),
}

impl ForecastError {
    pub fn model_fit(msg: impl Into<String>) -> Self {
        Self::ModelFit(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for the "not enough history" family of failures.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ForecastError::InsufficientData { .. })
    }
}
