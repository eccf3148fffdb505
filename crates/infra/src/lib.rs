//! Restocking engine runtime: collaborator sources, configuration, the
//! per-product forecasting pipeline and the ranked matrix assembly.

pub mod config;
pub mod error;
pub mod matrix;
pub mod service;
pub mod source;

pub use config::EngineConfig;
pub use error::{EngineError, ProductFailure, SourceError};
pub use matrix::{BuildReport, DegradedProduct, RestockingMatrix, RestockingMatrixBuilder, RestockingRow};
pub use service::{ForecastWithHistory, ProductForecastTotal, ProductOption, RestockingService};
pub use source::{InMemorySource, InventorySource, RetryPolicy, RetryingSource, SalesSource};
