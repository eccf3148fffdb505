use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// `(p, d, q)` order of an ARIMA model.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// Autoregressive lags.
    pub p: usize,
    /// Differencing passes.
    pub d: usize,
    /// Moving-average lags.
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.p > 10 {
            return Err(ForecastError::invalid_input("AR order must be <= 10"));
        }
        if self.d > 2 {
            return Err(ForecastError::invalid_input("differencing order must be <= 2"));
        }
        if self.q > 10 {
            return Err(ForecastError::invalid_input("MA order must be <= 10"));
        }
        Ok(())
    }
}

impl Default for ArimaOrder {
    /// AR(5) on first differences, no MA terms.
    fn default() -> Self {
        Self::new(5, 1, 0)
    }
}

impl core::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

/// A model fitted to one history, able to extrapolate it.
pub trait FittedModel: Send + Sync + core::fmt::Debug {
    /// Forecast the `steps` values following the fitted history.
    ///
    /// Must return exactly `steps` values.
    fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError>;
}

/// Pluggable model-fitting capability.
///
/// The engine only needs `fit(history, order) -> model`; tests substitute
/// deterministic stubs for the numerical backend.
pub trait ForecastBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit(&self, history: &[f64], order: ArimaOrder) -> Result<Box<dyn FittedModel>, ForecastError>;
}

impl<B> ForecastBackend for Arc<B>
where
    B: ForecastBackend + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fit(&self, history: &[f64], order: ArimaOrder) -> Result<Box<dyn FittedModel>, ForecastError> {
        (**self).fit(history, order)
    }
}
