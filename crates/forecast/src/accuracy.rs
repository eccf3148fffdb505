//! Hold-out accuracy of a fitted model.

use serde::{Deserialize, Serialize};

use replenish_sales::DailySeries;

use crate::error::ForecastError;
use crate::forecaster::{DemandForecaster, TrainedForecast};

/// Forecast error over the held-out slice. Both fields are `None` when there
/// was nothing to hold out (or no model could be fitted).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mean_squared_error: Option<f64>,
    pub root_mean_squared_error: Option<f64>,
}

impl AccuracyMetrics {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn from_mse(mse: f64) -> Self {
        Self {
            mean_squared_error: Some(mse),
            root_mean_squared_error: Some(mse.sqrt()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.mean_squared_error.is_some()
    }
}

/// Mean of squared position-wise differences; `None` for empty or mismatched input.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Some(sum / actual.len() as f64)
}

/// Scores a forecaster against the trailing slice it did not train on.
#[derive(Debug, Clone, Default)]
pub struct AccuracyEvaluator {
    forecaster: DemandForecaster,
}

impl AccuracyEvaluator {
    pub fn new(forecaster: DemandForecaster) -> Self {
        Self { forecaster }
    }

    /// Train on the leading slice of `series` and score the held-out rest.
    pub fn evaluate(&self, series: &DailySeries) -> Result<AccuracyMetrics, ForecastError> {
        let trained = self.forecaster.train(series)?;
        Self::score(&trained)
    }

    /// Score an already trained model, forecasting exactly as many steps as
    /// were held out and comparing by position.
    pub fn score(trained: &TrainedForecast) -> Result<AccuracyMetrics, ForecastError> {
        let actual = trained.evaluation().values();
        if actual.is_empty() {
            return Ok(AccuracyMetrics::unavailable());
        }

        let predicted = trained.predict(actual.len())?;
        Ok(mean_squared_error(actual, &predicted)
            .map(AccuracyMetrics::from_mse)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use replenish_core::ProductId;

    use crate::backend::{ArimaOrder, FittedModel, ForecastBackend};
    use crate::forecaster::ForecastConfig;

    /// Always predicts the last training value.
    #[derive(Debug)]
    struct NaiveModel(f64);

    impl FittedModel for NaiveModel {
        fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
            Ok(vec![self.0; steps])
        }
    }

    struct NaiveBackend;

    impl ForecastBackend for NaiveBackend {
        fn name(&self) -> &'static str {
            "naive"
        }

        fn fit(&self, history: &[f64], _order: ArimaOrder) -> Result<Box<dyn FittedModel>, ForecastError> {
            Ok(Box::new(NaiveModel(history.last().copied().unwrap_or(0.0))))
        }
    }

    fn evaluator() -> AccuracyEvaluator {
        AccuracyEvaluator::new(DemandForecaster::new(Arc::new(NaiveBackend), ForecastConfig::default()))
    }

    fn series(values: Vec<f64>) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        DailySeries::from_start(ProductId::new(9), start, values).unwrap()
    }

    #[test]
    fn mse_is_position_wise() {
        assert_eq!(mean_squared_error(&[1.0, 2.0, 3.0], &[1.0, 4.0, 0.0]), Some(13.0 / 3.0));
        assert_eq!(mean_squared_error(&[], &[]), None);
        assert_eq!(mean_squared_error(&[1.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn scores_held_out_tail() {
        // 10 points: train on 8 (last = 4.0), hold out [6.0, 2.0].
        let metrics = evaluator()
            .evaluate(&series(vec![1.0, 2.0, 3.0, 4.0, 5.0, 3.0, 2.0, 4.0, 6.0, 2.0]))
            .unwrap();

        assert_eq!(metrics.mean_squared_error, Some(4.0));
        assert_eq!(metrics.root_mean_squared_error, Some(2.0));
    }

    #[test]
    fn single_point_has_no_hold_out() {
        let metrics = evaluator().evaluate(&series(vec![3.0])).unwrap();
        assert_eq!(metrics, AccuracyMetrics::unavailable());
        assert!(!metrics.is_available());
    }

    #[test]
    fn empty_series_propagates_insufficient_data() {
        let err = evaluator().evaluate(&DailySeries::empty(ProductId::new(9))).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn arima_metrics_are_finite_for_regular_demand() {
        let values: Vec<f64> = (0..70).map(|t| 10.0 + ((t * 13) % 7) as f64).collect();
        let metrics = AccuracyEvaluator::default().evaluate(&series(values)).unwrap();

        let mse = metrics.mean_squared_error.unwrap();
        let rmse = metrics.root_mean_squared_error.unwrap();
        assert!(mse.is_finite() && mse >= 0.0);
        assert!((rmse * rmse - mse).abs() < 1e-9);
    }
}
