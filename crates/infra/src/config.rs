//! Engine configuration.
//!
//! An immutable value handed to the engine at construction. Defaults match the
//! fixed thresholds of the restocking rule; the environment can override them.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use replenish_forecast::ForecastConfig;
use replenish_inventory::RestockingPolicy;

use crate::error::EngineError;

pub const ENV_MIN_STOCK: &str = "REPLENISH_MIN_STOCK";
pub const ENV_MODERATE_BAND: &str = "REPLENISH_MODERATE_BAND";
pub const ENV_HORIZON_DAYS: &str = "REPLENISH_HORIZON_DAYS";
pub const ENV_PARALLELISM: &str = "REPLENISH_PARALLELISM";
pub const ENV_TIMEOUT_SECS: &str = "REPLENISH_TIMEOUT_SECS";
pub const ENV_TRAIN_RATIO: &str = "REPLENISH_TRAIN_RATIO";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub policy: RestockingPolicy,
    pub forecast: ForecastConfig,
    /// Days of forecast summed into the demand total `F`.
    pub restock_horizon_days: usize,
    /// Upper bound on products forecast concurrently.
    pub parallelism: usize,
    /// Overall deadline for a matrix build; `None` waits for every product.
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: RestockingPolicy::default(),
            forecast: ForecastConfig::default(),
            restock_horizon_days: 30,
            parallelism: 4,
            timeout: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `REPLENISH_*` environment variables.
    ///
    /// Unparseable values are logged and ignored. The result is not validated.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let policy = RestockingPolicy {
            minimum_stock: read_var(&lookup, ENV_MIN_STOCK, defaults.policy.minimum_stock),
            moderate_band: read_var(&lookup, ENV_MODERATE_BAND, defaults.policy.moderate_band),
        };
        let forecast = defaults
            .forecast
            .with_train_ratio(read_var(&lookup, ENV_TRAIN_RATIO, defaults.forecast.train_ratio));
        let timeout = match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    warn!(var = ENV_TIMEOUT_SECS, value = %raw, "invalid value; running without a timeout");
                    None
                }
            },
            None => defaults.timeout,
        };

        Self {
            policy,
            forecast,
            restock_horizon_days: read_var(&lookup, ENV_HORIZON_DAYS, defaults.restock_horizon_days),
            parallelism: read_var(&lookup, ENV_PARALLELISM, defaults.parallelism),
            timeout,
        }
    }

    pub fn with_policy(mut self, policy: RestockingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_forecast(mut self, forecast: ForecastConfig) -> Self {
        self.forecast = forecast;
        self
    }

    pub fn with_restock_horizon_days(mut self, days: usize) -> Self {
        self.restock_horizon_days = days;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.parallelism == 0 {
            return Err(EngineError::config("parallelism must be at least 1"));
        }
        if self.restock_horizon_days == 0 {
            return Err(EngineError::config("restock horizon must be at least one day"));
        }
        let ratio = self.forecast.train_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(EngineError::config(format!("train ratio must be in (0, 1], got {ratio}")));
        }
        self.forecast
            .order
            .validate()
            .map_err(|e| EngineError::config(e.to_string()))?;
        Ok(())
    }
}

fn read_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(var = key, value = %raw, default = %default, "invalid value; using default");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_restocking_rule() {
        let config = EngineConfig::default();
        assert_eq!(config.policy.minimum_stock, 10);
        assert_eq!(config.policy.moderate_band, 5);
        assert_eq!(config.restock_horizon_days, 30);
        assert_eq!(config.forecast.train_ratio, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_MIN_STOCK, "20"),
            (ENV_PARALLELISM, " 8 "),
            (ENV_TIMEOUT_SECS, "90"),
            (ENV_TRAIN_RATIO, "0.75"),
        ]));

        assert_eq!(config.policy.minimum_stock, 20);
        assert_eq!(config.policy.moderate_band, 5);
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.forecast.train_ratio, 0.75);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[(ENV_HORIZON_DAYS, "a month"), (ENV_TIMEOUT_SECS, "-1")]));
        assert_eq!(config.restock_horizon_days, 30);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn validate_rejects_unusable_settings() {
        assert!(EngineConfig::default().with_parallelism(0).validate().is_err());
        assert!(EngineConfig::default().with_restock_horizon_days(0).validate().is_err());

        let zero_ratio = EngineConfig::default().with_forecast(ForecastConfig::default().with_train_ratio(0.0));
        assert!(matches!(zero_ratio.validate(), Err(EngineError::Config(_))));

        let nan_ratio = EngineConfig::default().with_forecast(ForecastConfig::default().with_train_ratio(f64::NAN));
        assert!(nan_ratio.validate().is_err());

        let full = EngineConfig::default().with_forecast(ForecastConfig::default().with_train_ratio(1.0));
        assert!(full.validate().is_ok());
    }
}
