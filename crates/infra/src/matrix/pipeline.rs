//! Per-product forecasting pipeline.
//!
//! Each job owns its product's sales records, so jobs share nothing and can
//! run on any worker.

use tracing::{debug, warn};

use replenish_core::ProductId;
use replenish_forecast::{AccuracyEvaluator, AccuracyMetrics, DemandForecaster};
use replenish_inventory::InventoryRecord;
use replenish_sales::{DailySeries, SalesRecord, SalesSeriesBuilder};

use crate::error::ProductFailure;

/// Input of one product computation.
#[derive(Debug, Clone)]
pub struct ProductJob {
    pub record: InventoryRecord,
    pub sales: Vec<SalesRecord>,
}

impl ProductJob {
    pub fn new(record: InventoryRecord, sales: Vec<SalesRecord>) -> Self {
        Self { record, sales }
    }

    pub fn product_id(&self) -> ProductId {
        self.record.product_id
    }
}

/// Result of one product computation. Never an error: failures are values.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductOutcome {
    Forecasted {
        record: InventoryRecord,
        usage_frequency: f64,
        /// Sum of the raw forecast over the restock horizon.
        forecast_total: f64,
        metrics: AccuracyMetrics,
    },
    Degraded {
        record: InventoryRecord,
        usage_frequency: f64,
        reason: ProductFailure,
    },
}

impl ProductOutcome {
    pub fn record(&self) -> &InventoryRecord {
        match self {
            ProductOutcome::Forecasted { record, .. } | ProductOutcome::Degraded { record, .. } => record,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.record().product_id
    }

    pub fn usage_frequency(&self) -> f64 {
        match self {
            ProductOutcome::Forecasted { usage_frequency, .. } | ProductOutcome::Degraded { usage_frequency, .. } => {
                *usage_frequency
            }
        }
    }

    /// Demand total fed to the classifier; zero when no forecast exists.
    pub fn forecast_total(&self) -> f64 {
        match self {
            ProductOutcome::Forecasted { forecast_total, .. } => *forecast_total,
            ProductOutcome::Degraded { .. } => 0.0,
        }
    }

    pub fn metrics(&self) -> AccuracyMetrics {
        match self {
            ProductOutcome::Forecasted { metrics, .. } => *metrics,
            ProductOutcome::Degraded { .. } => AccuracyMetrics::unavailable(),
        }
    }

    pub fn failure(&self) -> Option<&ProductFailure> {
        match self {
            ProductOutcome::Forecasted { .. } => None,
            ProductOutcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ProductOutcome::Degraded { .. })
    }
}

/// Series, fit, hold-out score and horizon forecast for one product.
#[derive(Debug, Clone)]
pub struct ProductPipeline {
    forecaster: DemandForecaster,
    horizon_days: usize,
}

impl ProductPipeline {
    pub fn new(forecaster: DemandForecaster, horizon_days: usize) -> Self {
        Self {
            forecaster,
            horizon_days,
        }
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    pub fn run(&self, job: ProductJob) -> ProductOutcome {
        let ProductJob { record, sales } = job;
        let product_id = record.product_id;

        let series = match SalesSeriesBuilder::build(product_id, &sales) {
            Ok(series) => series,
            Err(e) => {
                warn!(product = %product_id, error = %e, "invalid sales history; product degraded");
                return ProductOutcome::Degraded {
                    record,
                    usage_frequency: 0.0,
                    reason: e.into(),
                };
            }
        };
        let usage_frequency = series.total();

        match self.forecast(&series) {
            Ok((forecast_total, metrics)) => {
                debug!(
                    product = %product_id,
                    observations = series.len(),
                    forecast_total,
                    mse = ?metrics.mean_squared_error,
                    "product forecast"
                );
                ProductOutcome::Forecasted {
                    record,
                    usage_frequency,
                    forecast_total,
                    metrics,
                }
            }
            Err(reason) => {
                if reason.is_insufficient_data() {
                    debug!(product = %product_id, observations = series.len(), "insufficient history; product degraded");
                } else {
                    warn!(product = %product_id, error = %reason, "forecast failed; product degraded");
                }
                ProductOutcome::Degraded {
                    record,
                    usage_frequency,
                    reason,
                }
            }
        }
    }

    /// One fitted model serves both the hold-out score and the horizon total.
    fn forecast(&self, series: &DailySeries) -> Result<(f64, AccuracyMetrics), ProductFailure> {
        let trained = self.forecaster.train(series)?;
        let metrics = AccuracyEvaluator::score(&trained)?;
        let forecast = trained.forecast(self.horizon_days)?;
        Ok((forecast.total(), metrics))
    }
}
