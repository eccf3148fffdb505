use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use replenish_core::{DomainError, DomainResult, ProductId};

/// One line of the sales ledger: a quantity of a product sold on a day.
///
/// Read-only input; the ledger itself lives in an external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub product_id: ProductId,
    /// Calendar day of the sale. Timestamps are truncated to their day.
    #[serde(deserialize_with = "deserialize_sale_date")]
    pub sale_date: NaiveDate,
    pub quantity_sold: f64,
}

impl SalesRecord {
    pub fn new(product_id: ProductId, sale_date: NaiveDate, quantity_sold: f64) -> Self {
        Self {
            product_id,
            sale_date,
            quantity_sold,
        }
    }

    /// Check the quantity is usable as demand.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.quantity_sold.is_finite() {
            return Err(DomainError::validation(format!(
                "product {}: quantity_sold on {} is not a finite number",
                self.product_id, self.sale_date
            )));
        }
        if self.quantity_sold < 0.0 {
            return Err(DomainError::validation(format!(
                "product {}: quantity_sold on {} is negative ({})",
                self.product_id, self.sale_date, self.quantity_sold
            )));
        }
        Ok(())
    }
}

/// Parse a sale date, accepting a plain date or a date-time.
///
/// Supported: `2024-03-01`, `2024-03-01T14:30:00`, `2024-03-01 14:30:00`
/// (optionally with fractional seconds) and RFC 3339 with an offset. The
/// time-of-day is dropped; an offset is ignored (the local calendar day is kept).
pub fn parse_sale_date(raw: &str) -> DomainResult<NaiveDate> {
    let s = raw.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    Err(DomainError::validation(format!("unparseable sale date: {raw:?}")))
}

fn deserialize_sale_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_sale_date(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_dates_and_timestamps() {
        assert_eq!(parse_sale_date("2024-03-01").unwrap(), day(2024, 3, 1));
        assert_eq!(parse_sale_date("2024-03-01T23:59:59").unwrap(), day(2024, 3, 1));
        assert_eq!(parse_sale_date("2024-03-01 08:15:00.250").unwrap(), day(2024, 3, 1));
        assert_eq!(parse_sale_date("2024-03-01T10:00:00+02:00").unwrap(), day(2024, 3, 1));
    }

    #[test]
    fn rejects_unparseable_dates() {
        let err = parse_sale_date("01/03/2024").unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("01/03/2024")));
    }

    #[test]
    fn deserializes_from_json_with_timestamp() {
        let json = r#"{"product_id": 7, "sale_date": "2024-05-02T16:20:00", "quantity_sold": 3}"#;
        let record: SalesRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, SalesRecord::new(ProductId::new(7), day(2024, 5, 2), 3.0));
    }

    #[test]
    fn validate_rejects_negative_and_nan() {
        let id = ProductId::new(1);
        assert!(SalesRecord::new(id, day(2024, 1, 1), 0.0).validate().is_ok());
        assert!(SalesRecord::new(id, day(2024, 1, 1), -1.0).validate().is_err());
        assert!(SalesRecord::new(id, day(2024, 1, 1), f64::NAN).validate().is_err());
    }
}
