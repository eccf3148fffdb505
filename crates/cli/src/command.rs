use serde_json::Value;
use thiserror::Error;

use replenish_core::ProductId;
use replenish_infra::{InventorySource, RestockingService, SalesSource};

pub const USAGE: &str = "\
usage: replenish <command>

commands:
  matrix                        ranked restocking matrix
  forecast <product-id> [days]  dated demand forecast with history
  accuracy <product-id>         hold-out MSE / RMSE
  totals [days]                 summed forecast per product
  products                      product selection labels
  help                          this message

environment:
  REPLENISH_DATA_DIR            directory holding inventory.json and sales.json (default .)
  REPLENISH_LOG_FORMAT          json | compact (default json, written to stderr)
  REPLENISH_*                   engine settings, see EngineConfig::from_env";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid {name}: {value:?}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Matrix,
    /// `days: None` uses the configured restock horizon.
    Forecast { product_id: ProductId, days: Option<usize> },
    Accuracy { product_id: ProductId },
    Totals { days: Option<usize> },
    Products,
    Help,
}

impl Command {
    /// Parse arguments following the program name.
    pub fn parse<I, A>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let mut rest = args.iter().map(String::as_str);

        let command = match rest.next() {
            None | Some("help" | "--help" | "-h") => Command::Help,
            Some("matrix") => Command::Matrix,
            Some("forecast") => Command::Forecast {
                product_id: product_arg(rest.next())?,
                days: days_arg(rest.next())?,
            },
            Some("accuracy") => Command::Accuracy {
                product_id: product_arg(rest.next())?,
            },
            Some("totals") => Command::Totals {
                days: days_arg(rest.next())?,
            },
            Some("products") => Command::Products,
            Some(other) => return Err(CliError::UnknownCommand(other.to_string())),
        };

        Ok(command)
    }

    /// Run against the engine, producing the JSON document to print.
    pub fn execute<I, S>(&self, service: &RestockingService<I, S>) -> anyhow::Result<Value>
    where
        I: InventorySource,
        S: SalesSource,
    {
        let horizon = service.config().restock_horizon_days;
        let value = match self {
            Command::Matrix => serde_json::to_value(service.build_matrix()?)?,
            Command::Forecast { product_id, days } => {
                serde_json::to_value(service.forecast_with_history(*product_id, days.unwrap_or(horizon))?)?
            }
            Command::Accuracy { product_id } => serde_json::to_value(service.evaluate_accuracy(*product_id)?)?,
            Command::Totals { days } => serde_json::to_value(service.restock_totals(days.unwrap_or(horizon))?)?,
            Command::Products => serde_json::to_value(service.product_options()?)?,
            Command::Help => Value::String(USAGE.to_string()),
        };
        Ok(value)
    }
}

fn product_arg(raw: Option<&str>) -> Result<ProductId, CliError> {
    let raw = raw.ok_or(CliError::MissingArgument("product-id"))?;
    raw.parse().map_err(|_| CliError::InvalidArgument {
        name: "product-id",
        value: raw.to_string(),
    })
}

fn days_arg(raw: Option<&str>) -> Result<Option<usize>, CliError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<usize>() {
        Ok(days) if days > 0 => Ok(Some(days)),
        _ => Err(CliError::InvalidArgument {
            name: "days",
            value: raw.to_string(),
        }),
    }
}
