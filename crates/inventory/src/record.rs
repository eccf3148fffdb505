use serde::{Deserialize, Serialize};

use replenish_core::ProductId;

/// Current stock of one product, read from the inventory ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub product_id: ProductId,
    pub name: String,
    pub current_stock: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub unit_price: f64,
}

impl InventoryRecord {
    pub fn new(product_id: ProductId, name: impl Into<String>, current_stock: i64) -> Self {
        Self {
            product_id,
            name: name.into(),
            current_stock,
            category: String::new(),
            unit_price: 0.0,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// Selection label, e.g. `"42 - Drill bit"`.
    pub fn option_label(&self) -> String {
        format!("{} - {}", self.product_id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_label_joins_id_and_name() {
        let record = InventoryRecord::new(ProductId::new(42), "Drill bit", 3);
        assert_eq!(record.option_label(), "42 - Drill bit");
    }

    #[test]
    fn category_and_price_are_optional_in_json() {
        let json = r#"{"product_id": 5, "name": "Gloves", "current_stock": 12}"#;
        let record: InventoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, InventoryRecord::new(ProductId::new(5), "Gloves", 12));
    }
}
