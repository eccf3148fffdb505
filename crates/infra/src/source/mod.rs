//! Collaborator data sources (inventory and sales ledgers).
//!
//! The engine only reads through these traits; storage lives elsewhere.
//! Implementations must tolerate concurrent reads.

pub mod in_memory;
pub mod retry;

use std::sync::Arc;

use replenish_inventory::InventoryRecord;
use replenish_sales::SalesRecord;

use crate::error::SourceError;

pub use in_memory::InMemorySource;
pub use retry::{BackoffStrategy, RetryPolicy, RetryingSource};

/// Read access to current stock levels.
pub trait InventorySource: Send + Sync {
    fn fetch_inventory(&self) -> Result<Vec<InventoryRecord>, SourceError>;
}

/// Read access to the historical sales ledger.
pub trait SalesSource: Send + Sync {
    fn fetch_sales(&self) -> Result<Vec<SalesRecord>, SourceError>;
}

impl<S> InventorySource for Arc<S>
where
    S: InventorySource + ?Sized,
{
    fn fetch_inventory(&self) -> Result<Vec<InventoryRecord>, SourceError> {
        (**self).fetch_inventory()
    }
}

impl<S> SalesSource for Arc<S>
where
    S: SalesSource + ?Sized,
{
    fn fetch_sales(&self) -> Result<Vec<SalesRecord>, SourceError> {
        (**self).fetch_sales()
    }
}
