//! Inventory module.
//!
//! Current stock records and the restocking rules applied to them,
//! implemented purely as deterministic logic (no IO, no forecasting).

pub mod classifier;
pub mod record;

pub use classifier::{RestockingClassifier, RestockingDecision, RestockingPolicy, RestockingStatus};
pub use record::InventoryRecord;
