//! Engine entry point for presentation/API callers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use replenish_core::ProductId;
use replenish_forecast::{AccuracyEvaluator, AccuracyMetrics, DemandForecaster, ForecastBackend, ForecastResult};
use replenish_inventory::InventoryRecord;
use replenish_sales::{DailySeries, SalesIndex, SalesRecord, SalesSeriesBuilder};

use crate::config::EngineConfig;
use crate::error::{EngineError, ProductFailure};
use crate::matrix::{RestockingMatrix, RestockingMatrixBuilder, run_bounded};
use crate::source::{InventorySource, SalesSource};

/// A forecast next to the history it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastWithHistory {
    pub history: DailySeries,
    pub forecast: ForecastResult,
}

/// Summed forecast quantity for one product over a horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductForecastTotal {
    pub product_id: ProductId,
    pub name: String,
    /// `None` when no forecast could be produced; `unavailable` says why.
    pub total_forecast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

impl ProductForecastTotal {
    pub fn is_available(&self) -> bool {
        self.total_forecast.is_some()
    }
}

/// Selection-list entry for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub product_id: ProductId,
    pub label: String,
}

/// Restocking engine over a pair of read-only collaborator sources.
///
/// Source failures are the only errors returned; anything that goes wrong for
/// a single product is reported inside the result.
pub struct RestockingService<I, S> {
    inventory: I,
    sales: S,
    config: EngineConfig,
    forecaster: DemandForecaster,
    builder: RestockingMatrixBuilder,
}

impl<I, S> core::fmt::Debug for RestockingService<I, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RestockingService")
            .field("config", &self.config)
            .field("forecaster", &self.forecaster)
            .finish_non_exhaustive()
    }
}

impl<I, S> RestockingService<I, S>
where
    I: InventorySource,
    S: SalesSource,
{
    /// Engine using the ARIMA backend.
    pub fn new(inventory: I, sales: S, config: EngineConfig) -> Result<Self, EngineError> {
        let forecaster = DemandForecaster::arima(config.forecast);
        Self::with_forecaster(inventory, sales, config, forecaster)
    }

    /// Engine using a custom forecasting backend.
    pub fn with_backend(
        inventory: I,
        sales: S,
        config: EngineConfig,
        backend: Arc<dyn ForecastBackend>,
    ) -> Result<Self, EngineError> {
        let forecaster = DemandForecaster::new(backend, config.forecast);
        Self::with_forecaster(inventory, sales, config, forecaster)
    }

    fn with_forecaster(
        inventory: I,
        sales: S,
        config: EngineConfig,
        forecaster: DemandForecaster,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let builder = RestockingMatrixBuilder::new(forecaster.clone(), &config);
        Ok(Self {
            inventory,
            sales,
            config,
            forecaster,
            builder,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ranked restocking matrix over every distinct inventory product.
    pub fn build_matrix(&self) -> Result<RestockingMatrix, EngineError> {
        let inventory = self.fetch_inventory()?;
        let sales = self.fetch_sales()?;
        Ok(self.builder.build(inventory, sales))
    }

    /// Dated forecast for `horizon_days` after the product's training slice.
    ///
    /// A product without a usable history yields an unavailable result.
    pub fn forecast_for_product(&self, product_id: ProductId, horizon_days: usize) -> Result<ForecastResult, EngineError> {
        Ok(self.forecast_with_history(product_id, horizon_days)?.forecast)
    }

    /// Forecast plus the full daily history, for plotting actuals against predictions.
    pub fn forecast_with_history(
        &self,
        product_id: ProductId,
        horizon_days: usize,
    ) -> Result<ForecastWithHistory, EngineError> {
        let sales = self.fetch_sales()?;
        let history = match SalesSeriesBuilder::build(product_id, &sales) {
            Ok(series) => series,
            Err(e) => {
                warn!(product = %product_id, error = %e, "invalid sales history; no forecast");
                return Ok(ForecastWithHistory {
                    history: DailySeries::empty(product_id),
                    forecast: ForecastResult::unavailable(product_id, e.to_string()),
                });
            }
        };

        let forecast = match self.forecaster.fit_and_forecast(&history, horizon_days) {
            Ok(forecast) => forecast,
            Err(e) => {
                debug!(product = %product_id, error = %e, "no forecast available");
                ForecastResult::unavailable(product_id, e.to_string())
            }
        };

        Ok(ForecastWithHistory { history, forecast })
    }

    /// Hold-out MSE/RMSE for one product; null metrics when none can be computed.
    pub fn evaluate_accuracy(&self, product_id: ProductId) -> Result<AccuracyMetrics, EngineError> {
        let sales = self.fetch_sales()?;
        let metrics = SalesSeriesBuilder::build(product_id, &sales)
            .map_err(|e| e.to_string())
            .and_then(|series| {
                AccuracyEvaluator::new(self.forecaster.clone())
                    .evaluate(&series)
                    .map_err(|e| e.to_string())
            });

        Ok(metrics.unwrap_or_else(|reason| {
            debug!(product = %product_id, reason = %reason, "accuracy unavailable");
            AccuracyMetrics::unavailable()
        }))
    }

    /// Summed forecast per inventory product over `horizon_days`, in inventory order.
    pub fn restock_totals(&self, horizon_days: usize) -> Result<Vec<ProductForecastTotal>, EngineError> {
        let inventory = self.fetch_inventory()?;
        let index = SalesIndex::from_records(self.fetch_sales()?);

        // Cloned rather than taken: a product listed twice gets its history twice.
        let jobs: Vec<(InventoryRecord, Vec<SalesRecord>)> = inventory
            .into_iter()
            .map(|record| {
                let sales = index.records_for(record.product_id).to_vec();
                (record, sales)
            })
            .collect();

        let forecaster = self.forecaster.clone();
        let run = run_bounded(jobs, self.config.parallelism, None, move |(record, sales)| {
            let product_id = record.product_id;
            let total = SalesSeriesBuilder::build(product_id, &sales)
                .map_err(ProductFailure::from)
                .and_then(|series| Ok(forecaster.fit_and_forecast(&series, horizon_days)?.total()));

            let (total_forecast, unavailable) = match total {
                Ok(total) => (Some(total), None),
                Err(reason) => {
                    if reason.is_insufficient_data() {
                        debug!(product = %product_id, "insufficient history; no restock total");
                    } else {
                        warn!(product = %product_id, error = %reason, "no restock total");
                    }
                    (None, Some(reason.to_string()))
                }
            };
            ProductForecastTotal {
                product_id,
                name: record.name,
                total_forecast,
                unavailable,
            }
        });

        Ok(run.results.into_iter().map(|(_, total)| total).collect())
    }

    /// `"<id> - <name>"` labels in inventory order.
    pub fn product_options(&self) -> Result<Vec<ProductOption>, EngineError> {
        Ok(self
            .fetch_inventory()?
            .iter()
            .map(|record| ProductOption {
                product_id: record.product_id,
                label: record.option_label(),
            })
            .collect())
    }

    fn fetch_inventory(&self) -> Result<Vec<InventoryRecord>, EngineError> {
        self.inventory.fetch_inventory().map_err(|e| {
            warn!(error = %e, "inventory source unavailable");
            EngineError::inventory_unavailable(e)
        })
    }

    fn fetch_sales(&self) -> Result<Vec<SalesRecord>, EngineError> {
        self.sales.fetch_sales().map_err(|e| {
            warn!(error = %e, "sales source unavailable");
            EngineError::sales_unavailable(e)
        })
    }
}
