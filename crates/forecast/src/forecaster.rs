use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use replenish_core::ProductId;
use replenish_sales::DailySeries;

use crate::arima::ArimaBackend;
use crate::backend::{ArimaOrder, FittedModel, ForecastBackend};
use crate::error::ForecastError;

/// Model settings shared by every product of a run.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub order: ArimaOrder,
    /// Share of the series (from the start) used for fitting; the rest is held out.
    pub train_ratio: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            train_ratio: 0.8,
        }
    }
}

impl ForecastConfig {
    pub fn with_order(mut self, order: ArimaOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_train_ratio(mut self, train_ratio: f64) -> Self {
        self.train_ratio = train_ratio;
        self
    }
}

/// Predicted demand for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_quantity: f64,
}

/// Dated forecast for one product.
///
/// Values are raw model output: they may be fractional or negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub product_id: ProductId,
    pub points: Vec<ForecastPoint>,
    /// Why no forecast could be produced, when `points` is empty for that reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

impl ForecastResult {
    pub fn unavailable(product_id: ProductId, reason: impl Into<String>) -> Self {
        Self {
            product_id,
            points: Vec::new(),
            unavailable: Some(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of predicted quantities over the horizon.
    pub fn total(&self) -> f64 {
        self.points.iter().fold(0.0, |acc, p| acc + p.predicted_quantity)
    }
}

/// Fits the configured model to a product's training slice.
#[derive(Clone)]
pub struct DemandForecaster {
    backend: Arc<dyn ForecastBackend>,
    config: ForecastConfig,
}

impl core::fmt::Debug for DemandForecaster {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DemandForecaster")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for DemandForecaster {
    fn default() -> Self {
        Self::arima(ForecastConfig::default())
    }
}

impl DemandForecaster {
    pub fn new(backend: Arc<dyn ForecastBackend>, config: ForecastConfig) -> Self {
        Self { backend, config }
    }

    pub fn arima(config: ForecastConfig) -> Self {
        Self::new(Arc::new(ArimaBackend), config)
    }

    pub fn config(&self) -> ForecastConfig {
        self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Number of leading observations used for training.
    ///
    /// `floor(len * train_ratio)`; a series too short to yield a single
    /// training point trains on all of itself.
    pub fn training_len(&self, len: usize) -> usize {
        let n = ((len as f64) * self.config.train_ratio) as usize;
        if n == 0 { len } else { n.min(len) }
    }

    /// Chronological training / evaluation split.
    pub fn split(&self, series: &DailySeries) -> (DailySeries, DailySeries) {
        series.split_at(self.training_len(series.len()))
    }

    /// Fit the model on the training slice, keeping the held-out slice around.
    pub fn train(&self, series: &DailySeries) -> Result<TrainedForecast, ForecastError> {
        let (training, evaluation) = self.split(series);
        if training.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let model = self.backend.fit(training.values(), self.config.order)?;

        debug!(
            product = %series.product_id(),
            backend = self.backend.name(),
            order = %self.config.order,
            training = training.len(),
            evaluation = evaluation.len(),
            "model fitted"
        );

        Ok(TrainedForecast {
            product_id: series.product_id(),
            training,
            evaluation,
            model,
        })
    }

    /// Train, then forecast `horizon_days` days after the last training date.
    pub fn fit_and_forecast(&self, series: &DailySeries, horizon_days: usize) -> Result<ForecastResult, ForecastError> {
        self.train(series)?.forecast(horizon_days)
    }
}

/// A model fitted to a product's training slice.
#[derive(Debug)]
pub struct TrainedForecast {
    product_id: ProductId,
    training: DailySeries,
    evaluation: DailySeries,
    model: Box<dyn FittedModel>,
}

impl TrainedForecast {
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn training(&self) -> &DailySeries {
        &self.training
    }

    pub fn evaluation(&self) -> &DailySeries {
        &self.evaluation
    }

    /// Raw model output for the `steps` days after the training slice.
    pub fn predict(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
        let values = self.model.forecast(steps)?;
        if values.len() != steps {
            return Err(ForecastError::model_fit(format!(
                "backend returned {} values for a {steps}-step forecast",
                values.len()
            )));
        }
        Ok(values)
    }

    /// Dated forecast starting the day after the last training date.
    pub fn forecast(&self, horizon_days: usize) -> Result<ForecastResult, ForecastError> {
        let values = self.predict(horizon_days)?;
        let start = self
            .training
            .date_at(self.training.len())
            .ok_or_else(|| ForecastError::invalid_input("forecast start date is out of range"))?;

        let points: Vec<ForecastPoint> = start
            .iter_days()
            .zip(values)
            .map(|(date, predicted_quantity)| ForecastPoint {
                date,
                predicted_quantity,
            })
            .collect();

        if points.len() != horizon_days {
            return Err(ForecastError::invalid_input("forecast horizon runs past the last representable date"));
        }

        Ok(ForecastResult {
            product_id: self.product_id,
            points,
            unavailable: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(values: Vec<f64>) -> DailySeries {
        DailySeries::from_start(ProductId::new(1), day(2024, 1, 1), values).unwrap()
    }

    /// Seasonal weekly demand with a little deterministic wobble.
    fn weekly_demand(days: usize) -> Vec<f64> {
        (0..days)
            .map(|t| {
                let weekday = [4.0, 6.0, 5.0, 7.0, 9.0, 12.0, 3.0][t % 7];
                weekday + ((t * 37) % 5) as f64
            })
            .collect()
    }

    #[test]
    fn training_len_truncates_eighty_percent() {
        let forecaster = DemandForecaster::default();
        assert_eq!(forecaster.training_len(0), 0);
        assert_eq!(forecaster.training_len(1), 1);
        assert_eq!(forecaster.training_len(2), 1);
        assert_eq!(forecaster.training_len(10), 8);
        assert_eq!(forecaster.training_len(14), 11);
        assert_eq!(forecaster.training_len(99), 79);
    }

    #[test]
    fn forecast_starts_the_day_after_training_and_has_horizon_length() {
        let forecaster = DemandForecaster::default();
        let history = series(weekly_demand(60));

        let result = forecaster.fit_and_forecast(&history, 30).unwrap();

        assert_eq!(result.len(), 30);
        // 60 * 0.8 = 48 training days: 2024-01-01 ..= 2024-02-17.
        assert_eq!(result.points[0].date, day(2024, 2, 18));
        for pair in result.points.windows(2) {
            assert_eq!(pair[1].date, pair[0].date + Days::new(1));
        }
        assert!(result.is_available());
    }

    #[test]
    fn empty_series_is_insufficient_data() {
        let forecaster = DemandForecaster::default();
        let err = forecaster
            .fit_and_forecast(&DailySeries::empty(ProductId::new(1)), 30)
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn constant_series_forecast_their_level() {
        let forecaster = DemandForecaster::default();

        let zeros = forecaster.fit_and_forecast(&series(vec![0.0; 40]), 30).unwrap();
        assert!(zeros.is_available());
        assert_eq!(zeros.total(), 0.0);

        let steady = forecaster.fit_and_forecast(&series(vec![4.0; 40]), 30).unwrap();
        assert!(steady.points.iter().all(|p| p.predicted_quantity == 4.0));
        assert_eq!(steady.total(), 120.0);
    }

    #[test]
    fn a_few_days_of_history_still_forecast() {
        let forecaster = DemandForecaster::default();
        // Three days train on two, which leaves one difference.
        let result = forecaster.fit_and_forecast(&series(vec![2.0, 2.0, 3.0]), 30).unwrap();
        assert_eq!(result.len(), 30);
        assert!(result.points.iter().all(|p| p.predicted_quantity == 2.0));
    }

    #[test]
    fn single_day_history_is_insufficient_for_differencing() {
        let forecaster = DemandForecaster::default();
        let err = forecaster.fit_and_forecast(&series(vec![5.0]), 30).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { required: 2, actual: 1 });
    }

    #[test]
    fn train_keeps_held_out_slice() {
        let forecaster = DemandForecaster::default();
        let trained = forecaster.train(&series(weekly_demand(50))).unwrap();

        assert_eq!(trained.training().len(), 40);
        assert_eq!(trained.evaluation().len(), 10);
        assert_eq!(trained.evaluation().first_date(), Some(day(2024, 2, 10)));
    }

    #[derive(Debug)]
    struct ShortModel;

    impl FittedModel for ShortModel {
        fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
            Ok(vec![1.0; steps.saturating_sub(1)])
        }
    }

    struct ShortBackend;

    impl ForecastBackend for ShortBackend {
        fn name(&self) -> &'static str {
            "short"
        }

        fn fit(&self, _history: &[f64], _order: ArimaOrder) -> Result<Box<dyn FittedModel>, ForecastError> {
            Ok(Box::new(ShortModel))
        }
    }

    #[test]
    fn backend_returning_wrong_length_is_a_fit_error() {
        let forecaster = DemandForecaster::new(Arc::new(ShortBackend), ForecastConfig::default());
        let err = forecaster.fit_and_forecast(&series(vec![1.0, 2.0, 3.0]), 5).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFit(msg) if msg.contains("4 values")));
    }
}
