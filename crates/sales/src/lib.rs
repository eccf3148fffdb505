//! Sales history module.
//!
//! Turns the raw sales ledger into regular per-product daily demand series.
//! Pure data transformation (no IO, no storage).

pub mod record;
pub mod series;

pub use record::{SalesRecord, parse_sale_date};
pub use series::{DailySeries, SalesIndex, SalesSeriesBuilder, SeriesPoint};
