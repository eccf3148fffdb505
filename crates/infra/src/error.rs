use thiserror::Error;

use replenish_core::DomainError;
use replenish_forecast::ForecastError;

/// Failure reading a collaborator data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The source could not be reached or read (possibly transient).
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with data that cannot be interpreted.
    #[error("malformed source data: {0}")]
    Malformed(String),

    /// The source does not exist; retrying will not make it appear.
    #[error("source data not found: {0}")]
    NotFound(String),
}

impl SourceError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Worth retrying at the collaborator boundary.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

/// Run-level failure: nothing meaningful can be returned to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{source_name} source unavailable")]
    SourceUnavailable {
        source_name: &'static str,
        #[source]
        error: SourceError,
    },

    #[error("invalid engine configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn inventory_unavailable(error: SourceError) -> Self {
        Self::SourceUnavailable {
            source_name: "inventory",
            error,
        }
    }

    pub fn sales_unavailable(error: SourceError) -> Self {
        Self::SourceUnavailable {
            source_name: "sales",
            error,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Why a single product could not be forecast. Recovered at the product
/// boundary: the product is kept with null metrics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProductFailure {
    #[error("invalid sales history: {0}")]
    InvalidSales(#[from] DomainError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

impl ProductFailure {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ProductFailure::Forecast(e) if e.is_insufficient_data())
    }
}
