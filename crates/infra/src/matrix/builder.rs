use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use replenish_core::RunId;
use replenish_forecast::DemandForecaster;
use replenish_inventory::{InventoryRecord, RestockingClassifier};
use replenish_sales::{SalesIndex, SalesRecord};

use super::pipeline::{ProductJob, ProductOutcome, ProductPipeline};
use super::row::{BuildReport, DegradedProduct, RestockingMatrix, RestockingRow, sort_rows};
use super::runner::run_bounded;
use crate::config::EngineConfig;

/// Forecasts and classifies every distinct inventory product, then ranks them.
#[derive(Debug, Clone)]
pub struct RestockingMatrixBuilder {
    pipeline: ProductPipeline,
    classifier: RestockingClassifier,
    parallelism: usize,
    timeout: Option<Duration>,
}

impl RestockingMatrixBuilder {
    pub fn new(forecaster: DemandForecaster, config: &EngineConfig) -> Self {
        Self {
            pipeline: ProductPipeline::new(forecaster, config.restock_horizon_days),
            classifier: RestockingClassifier::new(config.policy),
            parallelism: config.parallelism,
            timeout: config.timeout,
        }
    }

    pub fn classifier(&self) -> &RestockingClassifier {
        &self.classifier
    }

    /// Build the ranked matrix from one snapshot of both ledgers.
    ///
    /// Per-product failures become degraded rows. Products not reached before
    /// the timeout get no row and are listed in `report.skipped`.
    pub fn build(&self, inventory: Vec<InventoryRecord>, sales: Vec<SalesRecord>) -> RestockingMatrix {
        let started = Instant::now();
        let run_id = RunId::new();

        let products = distinct_products(inventory);
        let mut index = SalesIndex::from_records(sales);
        let jobs: Vec<ProductJob> = products
            .iter()
            .map(|record| ProductJob::new(record.clone(), index.take(record.product_id)))
            .collect();

        info!(
            run = %run_id,
            products = jobs.len(),
            parallelism = self.parallelism,
            timeout_ms = self.timeout.map(|t| t.as_millis() as u64),
            "restocking matrix build started"
        );

        let pipeline = self.pipeline.clone();
        let run = run_bounded(jobs, self.parallelism, self.timeout, move |job| pipeline.run(job));

        let mut report = BuildReport::new(run_id);
        report.timed_out = run.timed_out;
        report.skipped = run
            .missing(products.len())
            .into_iter()
            .map(|i| products[i].product_id)
            .collect();

        let mut rows = Vec::with_capacity(run.results.len());
        for (_, outcome) in run.results {
            report.completed.push(outcome.product_id());
            if let Some(reason) = outcome.failure() {
                report.degraded.push(DegradedProduct {
                    product_id: outcome.product_id(),
                    reason: reason.to_string(),
                });
            }
            rows.push(self.row(&outcome));
        }

        // Rows are still in inventory order here, which the stable sort keeps for ties.
        sort_rows(&mut rows);
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        if report.timed_out {
            warn!(
                run = %run_id,
                completed = report.completed.len(),
                skipped = report.skipped.len(),
                "restocking matrix build timed out"
            );
        }
        info!(
            run = %run_id,
            completed = report.completed.len(),
            skipped = report.skipped.len(),
            degraded = report.degraded.len(),
            elapsed_ms = report.elapsed_ms,
            "restocking matrix build finished"
        );

        RestockingMatrix { rows, report }
    }

    fn row(&self, outcome: &ProductOutcome) -> RestockingRow {
        let record = outcome.record();
        let decision = self.classifier.classify(outcome.forecast_total(), record.current_stock);
        debug!(
            product = %record.product_id,
            status = %decision.status,
            recommended = decision.recommended_quantity,
            "product classified"
        );
        RestockingRow::new(
            record,
            &self.classifier.policy(),
            decision,
            outcome.usage_frequency(),
            outcome.metrics(),
        )
    }
}

/// First record wins for repeated product ids; order of first encounter is kept.
fn distinct_products(inventory: Vec<InventoryRecord>) -> Vec<InventoryRecord> {
    let mut seen = HashSet::with_capacity(inventory.len());
    inventory
        .into_iter()
        .filter(|record| {
            let first = seen.insert(record.product_id);
            if !first {
                debug!(product = %record.product_id, "duplicate inventory record ignored");
            }
            first
        })
        .collect()
}
