//! `replenish-forecast`
//!
//! **Responsibility:** demand forecasting for a single product series.
//!
//! - Fits a fixed-order ARIMA model (or any pluggable [`ForecastBackend`]) to
//!   the chronological training slice of a daily series.
//! - Produces dated forecasts and hold-out accuracy metrics.
//! - Never decides restocking; that belongs to `replenish-inventory`.

pub mod accuracy;
pub mod arima;
pub mod backend;
pub mod error;
pub mod forecaster;

pub use accuracy::{AccuracyEvaluator, AccuracyMetrics, mean_squared_error};
pub use arima::{ArimaBackend, FittedArima};
pub use backend::{ArimaOrder, FittedModel, ForecastBackend};
pub use error::ForecastError;
pub use forecaster::{DemandForecaster, ForecastConfig, ForecastPoint, ForecastResult, TrainedForecast};
