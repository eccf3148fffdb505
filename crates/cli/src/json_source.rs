use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use replenish_infra::{InventorySource, SalesSource, SourceError};
use replenish_inventory::InventoryRecord;
use replenish_sales::SalesRecord;

pub const INVENTORY_FILE: &str = "inventory.json";
pub const SALES_FILE: &str = "sales.json";

/// Inventory and sales ledgers stored as JSON arrays on disk.
///
/// Files are re-read on every fetch, so each engine call sees current data.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    inventory_path: PathBuf,
    sales_path: PathBuf,
}

impl JsonFileSource {
    pub fn new(inventory_path: impl Into<PathBuf>, sales_path: impl Into<PathBuf>) -> Self {
        Self {
            inventory_path: inventory_path.into(),
            sales_path: sales_path.into(),
        }
    }

    /// `inventory.json` and `sales.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(INVENTORY_FILE), dir.join(SALES_FILE))
    }

    pub fn inventory_path(&self) -> &Path {
        &self.inventory_path
    }

    pub fn sales_path(&self) -> &Path {
        &self.sales_path
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        let msg = format!("{}: {e}", path.display());
        match e.kind() {
            io::ErrorKind::NotFound => SourceError::not_found(msg),
            _ => SourceError::unavailable(msg),
        }
    })?;
    let records: Vec<T> =
        serde_json::from_str(&raw).map_err(|e| SourceError::malformed(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), records = records.len(), "ledger file read");
    Ok(records)
}

impl InventorySource for JsonFileSource {
    fn fetch_inventory(&self) -> Result<Vec<InventoryRecord>, SourceError> {
        read_records(&self.inventory_path)
    }
}

impl SalesSource for JsonFileSource {
    fn fetch_sales(&self) -> Result<Vec<SalesRecord>, SourceError> {
        read_records(&self.sales_path)
    }
}
