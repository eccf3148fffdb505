//! Restocking matrix: per-product pipeline, bounded runner and ranked assembly.

pub mod builder;
pub mod pipeline;
pub mod row;
pub mod runner;

pub use builder::RestockingMatrixBuilder;
pub use pipeline::{ProductJob, ProductOutcome, ProductPipeline};
pub use row::{BuildReport, DegradedProduct, RestockingMatrix, RestockingRow, sort_rows};
pub use runner::{BoundedRun, run_bounded};
