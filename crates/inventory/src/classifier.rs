use serde::{Deserialize, Serialize};

/// Restocking priority label, ordered by urgency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestockingStatus {
    Urgent,
    Moderate,
    Adequate,
    NonPriority,
}

impl RestockingStatus {
    /// Sort rank: Urgent=0, Moderate=1, Adequate=2, NonPriority=3.
    pub fn rank(&self) -> u8 {
        match self {
            RestockingStatus::Urgent => 0,
            RestockingStatus::Moderate => 1,
            RestockingStatus::Adequate => 2,
            RestockingStatus::NonPriority => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RestockingStatus::Urgent => "Urgent",
            RestockingStatus::Moderate => "Moderate",
            RestockingStatus::Adequate => "Adequate",
            RestockingStatus::NonPriority => "NonPriority",
        }
    }
}

impl core::fmt::Display for RestockingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Stock thresholds used by the classifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockingPolicy {
    /// Safety floor `M`: stock below this is urgent (or topped up when no demand is forecast).
    pub minimum_stock: i64,
    /// Width `W` of the moderate band `[M, M + W)`.
    pub moderate_band: i64,
}

impl Default for RestockingPolicy {
    fn default() -> Self {
        Self {
            minimum_stock: 10,
            moderate_band: 5,
        }
    }
}

impl RestockingPolicy {
    pub fn new(minimum_stock: i64, moderate_band: i64) -> Self {
        Self {
            minimum_stock,
            moderate_band,
        }
    }
}

/// Classifier output for one product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockingDecision {
    pub recommended_quantity: u64,
    pub status: RestockingStatus,
}

/// Turns forecast demand plus current stock into a restocking decision.
///
/// Two gates, applied in order:
/// 1. Demand gate: if the forecast total floors to zero there is nothing to
///    sell through. Stock under `M` is topped up to `M` (NonPriority),
///    otherwise the product is Adequate.
/// 2. Stock gate: with demand, stock under `M` is Urgent, under `M + W` is
///    Moderate, anything else is Adequate; the recommendation is the floored
///    forecast total.
///
/// Adequate always recommends zero, whichever branch produced it.
///
/// Negative and non-finite forecast totals count as zero demand.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RestockingClassifier {
    policy: RestockingPolicy,
}

impl RestockingClassifier {
    pub fn new(policy: RestockingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RestockingPolicy {
        self.policy
    }

    pub fn classify(&self, forecast_total: f64, current_stock: i64) -> RestockingDecision {
        let minimum = self.policy.minimum_stock;
        let demand = if forecast_total.is_finite() {
            forecast_total.max(0.0)
        } else {
            0.0
        };
        let demand_units = demand.floor() as u64;

        let (mut recommended_quantity, status) = if demand_units == 0 {
            if current_stock < minimum {
                let shortfall = minimum.saturating_sub(current_stock).max(0) as u64;
                (shortfall, RestockingStatus::NonPriority)
            } else {
                (0, RestockingStatus::Adequate)
            }
        } else if current_stock < minimum {
            (demand_units, RestockingStatus::Urgent)
        } else if current_stock < minimum.saturating_add(self.policy.moderate_band) {
            (demand_units, RestockingStatus::Moderate)
        } else {
            (demand_units, RestockingStatus::Adequate)
        };

        if status == RestockingStatus::Adequate {
            recommended_quantity = 0;
        }

        RestockingDecision {
            recommended_quantity,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify(forecast: f64, stock: i64) -> RestockingDecision {
        RestockingClassifier::default().classify(forecast, stock)
    }

    fn decision(recommended_quantity: u64, status: RestockingStatus) -> RestockingDecision {
        RestockingDecision {
            recommended_quantity,
            status,
        }
    }

    #[test]
    fn no_demand_low_stock_tops_up_to_minimum() {
        assert_eq!(classify(0.0, 5), decision(5, RestockingStatus::NonPriority));
    }

    #[test]
    fn no_demand_healthy_stock_is_adequate() {
        assert_eq!(classify(0.0, 15), decision(0, RestockingStatus::Adequate));
    }

    #[test]
    fn demand_below_minimum_is_urgent() {
        assert_eq!(classify(20.0, 8), decision(20, RestockingStatus::Urgent));
    }

    #[test]
    fn demand_inside_moderate_band_is_moderate() {
        assert_eq!(classify(20.0, 12), decision(20, RestockingStatus::Moderate));
    }

    #[test]
    fn demand_with_healthy_stock_is_adequate_with_zero_restock() {
        assert_eq!(classify(20.0, 20), decision(0, RestockingStatus::Adequate));
        assert_eq!(classify(20.0, 15), decision(0, RestockingStatus::Adequate));
    }

    #[test]
    fn fractional_demand_is_floored() {
        assert_eq!(classify(0.9, 15), decision(0, RestockingStatus::Adequate));
        assert_eq!(classify(0.9, 4), decision(6, RestockingStatus::NonPriority));
        assert_eq!(classify(7.8, 9), decision(7, RestockingStatus::Urgent));
    }

    #[test]
    fn negative_and_nan_forecasts_mean_no_demand() {
        assert_eq!(classify(-35.2, 5), decision(5, RestockingStatus::NonPriority));
        assert_eq!(classify(f64::NAN, 20), decision(0, RestockingStatus::Adequate));
        assert_eq!(classify(f64::NEG_INFINITY, 0), decision(10, RestockingStatus::NonPriority));
    }

    #[test]
    fn thresholds_come_from_the_policy() {
        let classifier = RestockingClassifier::new(RestockingPolicy::new(50, 20));
        assert_eq!(classifier.classify(12.0, 60), decision(12, RestockingStatus::Moderate));
        assert_eq!(classifier.classify(0.0, 45), decision(5, RestockingStatus::NonPriority));
        assert_eq!(classifier.classify(12.0, 70), decision(0, RestockingStatus::Adequate));
    }

    #[test]
    fn ranks_follow_urgency() {
        let mut statuses = vec![
            RestockingStatus::NonPriority,
            RestockingStatus::Adequate,
            RestockingStatus::Urgent,
            RestockingStatus::Moderate,
        ];
        statuses.sort_by_key(RestockingStatus::rank);
        assert_eq!(
            statuses,
            vec![
                RestockingStatus::Urgent,
                RestockingStatus::Moderate,
                RestockingStatus::Adequate,
                RestockingStatus::NonPriority,
            ]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: a zero recommendation happens exactly when the product is Adequate.
        #[test]
        fn zero_restock_iff_adequate(forecast in -100.0f64..500.0, stock in -50i64..100) {
            let d = classify(forecast, stock);
            prop_assert_eq!(d.recommended_quantity == 0, d.status == RestockingStatus::Adequate);
        }

        /// Property: the stock floor alone decides whether a product needs attention now.
        #[test]
        fn below_minimum_is_never_adequate(forecast in -100.0f64..500.0, stock in -50i64..10) {
            let d = classify(forecast, stock);
            prop_assert!(matches!(d.status, RestockingStatus::Urgent | RestockingStatus::NonPriority));
        }
    }
}
