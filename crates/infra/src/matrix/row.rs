use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use replenish_core::{ProductId, RunId};
use replenish_forecast::AccuracyMetrics;
use replenish_inventory::{InventoryRecord, RestockingDecision, RestockingPolicy, RestockingStatus};

/// One product's line in the restocking matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockingRow {
    pub product_id: ProductId,
    pub name: String,
    pub current_stock: i64,
    pub minimum_required_stock: i64,
    pub recommended_restock_quantity: u64,
    pub priority_status: RestockingStatus,
    /// Total historical demand.
    pub usage_frequency: f64,
    /// `None` when the product had no hold-out slice or no model could be fitted.
    pub mse: Option<f64>,
    pub rmse: Option<f64>,
}

impl RestockingRow {
    pub fn new(
        record: &InventoryRecord,
        policy: &RestockingPolicy,
        decision: RestockingDecision,
        usage_frequency: f64,
        metrics: AccuracyMetrics,
    ) -> Self {
        Self {
            product_id: record.product_id,
            name: record.name.clone(),
            current_stock: record.current_stock,
            minimum_required_stock: policy.minimum_stock,
            recommended_restock_quantity: decision.recommended_quantity,
            priority_status: decision.status,
            // Adding +0.0 turns a negative zero into a positive one.
            usage_frequency: usage_frequency + 0.0,
            mse: metrics.mean_squared_error,
            rmse: metrics.root_mean_squared_error,
        }
    }

    pub fn priority_rank(&self) -> u8 {
        self.priority_status.rank()
    }
}

/// Order rows by priority rank (ascending), then usage frequency (descending).
///
/// The sort is stable: rows equal on both keys keep their input order. Usage
/// compares numerically, so `-0.0` and `0.0` tie.
pub fn sort_rows(rows: &mut [RestockingRow]) {
    rows.sort_by(|a, b| {
        a.priority_rank().cmp(&b.priority_rank()).then_with(|| {
            b.usage_frequency
                .partial_cmp(&a.usage_frequency)
                .unwrap_or(Ordering::Equal)
        })
    });
}

/// A product kept in the matrix with null metrics, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedProduct {
    pub product_id: ProductId,
    pub reason: String,
}

/// What happened during one matrix build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub run_id: RunId,
    /// Products that have a row (forecast or degraded), in inventory order.
    pub completed: Vec<ProductId>,
    /// Products not reached before the timeout; they have no row.
    pub skipped: Vec<ProductId>,
    /// Subset of `completed` whose row carries null metrics.
    pub degraded: Vec<DegradedProduct>,
    pub timed_out: bool,
    pub elapsed_ms: u64,
}

impl BuildReport {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            completed: Vec::new(),
            skipped: Vec::new(),
            degraded: Vec::new(),
            timed_out: false,
            elapsed_ms: 0,
        }
    }

    /// Every product got a row.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Ranked restocking table, one row per completed product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockingMatrix {
    pub rows: Vec<RestockingRow>,
    pub report: BuildReport,
}

impl RestockingMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RestockingRow> {
        self.rows.iter()
    }

    pub fn row(&self, product_id: ProductId) -> Option<&RestockingRow> {
        self.rows.iter().find(|r| r.product_id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(id: i64, status: RestockingStatus, usage: f64) -> RestockingRow {
        RestockingRow {
            product_id: ProductId::new(id),
            name: format!("product {id}"),
            current_stock: 0,
            minimum_required_stock: 10,
            recommended_restock_quantity: 0,
            priority_status: status,
            usage_frequency: usage,
            mse: None,
            rmse: None,
        }
    }

    fn ids(rows: &[RestockingRow]) -> Vec<i64> {
        rows.iter().map(|r| r.product_id.value()).collect()
    }

    #[test]
    fn sorts_by_rank_then_usage_descending() {
        let mut rows = vec![
            row(1, RestockingStatus::NonPriority, 100.0),
            row(2, RestockingStatus::Adequate, 5.0),
            row(3, RestockingStatus::Urgent, 1.0),
            row(4, RestockingStatus::Moderate, 3.0),
            row(5, RestockingStatus::Urgent, 9.0),
        ];

        sort_rows(&mut rows);

        assert_eq!(ids(&rows), vec![5, 3, 4, 2, 1]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let mut rows = vec![
            row(7, RestockingStatus::Moderate, 2.0),
            row(3, RestockingStatus::Moderate, 2.0),
            row(9, RestockingStatus::Moderate, 2.0),
        ];

        sort_rows(&mut rows);

        assert_eq!(ids(&rows), vec![7, 3, 9]);
    }

    #[test]
    fn signed_zero_usage_ties_and_keeps_input_order() {
        let mut rows = vec![
            row(1, RestockingStatus::NonPriority, 0.0),
            row(2, RestockingStatus::NonPriority, -0.0),
            row(3, RestockingStatus::NonPriority, 0.0),
        ];

        sort_rows(&mut rows);

        assert_eq!(ids(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn row_stores_negative_zero_usage_as_zero() {
        let record = InventoryRecord::new(ProductId::new(4), "Washers", 20);
        let decision = RestockingDecision {
            recommended_quantity: 0,
            status: RestockingStatus::NonPriority,
        };

        let r = RestockingRow::new(&record, &RestockingPolicy::default(), decision, -0.0, AccuracyMetrics::unavailable());

        assert!(r.usage_frequency.is_sign_positive());
        assert_eq!(serde_json::to_string(&r.usage_frequency).unwrap(), "0.0");
    }

    #[test]
    fn row_copies_decision_and_metrics() {
        let record = InventoryRecord::new(ProductId::new(12), "Bolts", 3);
        let decision = RestockingDecision {
            recommended_quantity: 40,
            status: RestockingStatus::Urgent,
        };

        let r = RestockingRow::new(&record, &RestockingPolicy::default(), decision, 61.5, AccuracyMetrics::from_mse(4.0));

        assert_eq!(r.name, "Bolts");
        assert_eq!(r.minimum_required_stock, 10);
        assert_eq!(r.recommended_restock_quantity, 40);
        assert_eq!(r.mse, Some(4.0));
        assert_eq!(r.rmse, Some(2.0));
    }

    #[test]
    fn matrix_serializes_status_and_null_metrics() {
        let matrix = RestockingMatrix {
            rows: vec![row(1, RestockingStatus::NonPriority, 0.0)],
            report: BuildReport::new(RunId::new()),
        };

        let json = serde_json::to_value(&matrix).unwrap();
        assert_eq!(json["rows"][0]["priority_status"], "NonPriority");
        assert!(json["rows"][0]["mse"].is_null());
        assert_eq!(json["report"]["timed_out"], false);
    }

    fn status_strategy() -> impl Strategy<Value = RestockingStatus> {
        prop_oneof![
            Just(RestockingStatus::Urgent),
            Just(RestockingStatus::Moderate),
            Just(RestockingStatus::Adequate),
            Just(RestockingStatus::NonPriority),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: adjacent rows never violate the (rank asc, usage desc)
        /// order, and full ties keep input order.
        #[test]
        fn sorted_rows_respect_both_keys(
            entries in prop::collection::vec((status_strategy(), 0u32..6), 0..40)
        ) {
            let mut rows: Vec<RestockingRow> = entries
                .iter()
                .enumerate()
                .map(|(i, (status, usage))| row(i as i64, *status, *usage as f64))
                .collect();

            sort_rows(&mut rows);

            for pair in rows.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!(a.priority_rank() <= b.priority_rank());
                if a.priority_rank() == b.priority_rank() {
                    prop_assert!(a.usage_frequency >= b.usage_frequency);
                    if a.usage_frequency == b.usage_frequency {
                        prop_assert!(a.product_id < b.product_id);
                    }
                }
            }
        }
    }
}
