use std::sync::RwLock;

use replenish_inventory::InventoryRecord;
use replenish_sales::SalesRecord;

use super::{InventorySource, SalesSource};
use crate::error::SourceError;

/// In-memory inventory + sales ledger for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySource {
    inventory: RwLock<Vec<InventoryRecord>>,
    sales: RwLock<Vec<SalesRecord>>,
}

impl InMemorySource {
    pub fn new(inventory: Vec<InventoryRecord>, sales: Vec<SalesRecord>) -> Self {
        Self {
            inventory: RwLock::new(inventory),
            sales: RwLock::new(sales),
        }
    }

    pub fn replace_inventory(&self, inventory: Vec<InventoryRecord>) {
        if let Ok(mut guard) = self.inventory.write() {
            *guard = inventory;
        }
    }

    pub fn record_sale(&self, sale: SalesRecord) {
        if let Ok(mut guard) = self.sales.write() {
            guard.push(sale);
        }
    }
}

impl InventorySource for InMemorySource {
    fn fetch_inventory(&self) -> Result<Vec<InventoryRecord>, SourceError> {
        self.inventory
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SourceError::unavailable("inventory lock poisoned"))
    }
}

impl SalesSource for InMemorySource {
    fn fetch_sales(&self) -> Result<Vec<SalesRecord>, SourceError> {
        self.sales
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SourceError::unavailable("sales lock poisoned"))
    }
}
