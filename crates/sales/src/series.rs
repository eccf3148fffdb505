use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use replenish_core::{DomainError, DomainResult, ProductId};

use crate::record::SalesRecord;

/// One observation of a daily series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Regular daily demand series for one product.
///
/// Stored as a start date plus one quantity per day, so the dates are
/// contiguous by construction. Quantities are finite and non-negative, and
/// deserialization goes through the same checks as [`DailySeries::from_start`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDailySeries")]
pub struct DailySeries {
    product_id: ProductId,
    start: Option<NaiveDate>,
    quantities: Vec<f64>,
}

/// Unchecked wire form of [`DailySeries`].
#[derive(Deserialize)]
struct RawDailySeries {
    product_id: ProductId,
    start: Option<NaiveDate>,
    #[serde(default)]
    quantities: Vec<f64>,
}

impl TryFrom<RawDailySeries> for DailySeries {
    type Error = DomainError;

    fn try_from(raw: RawDailySeries) -> Result<Self, Self::Error> {
        match raw.start {
            Some(start) => Self::from_start(raw.product_id, start, raw.quantities),
            None if raw.quantities.is_empty() => Ok(Self::empty(raw.product_id)),
            None => Err(DomainError::invariant(format!(
                "daily series for product {} has quantities but no start date",
                raw.product_id
            ))),
        }
    }
}

impl DailySeries {
    /// A series with no observations ("insufficient data", not a fault).
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            start: None,
            quantities: Vec::new(),
        }
    }

    /// Build a series of consecutive days starting at `start`.
    pub fn from_start(product_id: ProductId, start: NaiveDate, quantities: Vec<f64>) -> DomainResult<Self> {
        if let Some(bad) = quantities.iter().find(|q| !q.is_finite() || **q < 0.0) {
            return Err(DomainError::invariant(format!(
                "daily series for product {product_id} contains invalid quantity {bad}"
            )));
        }
        if quantities.is_empty() {
            return Ok(Self::empty(product_id));
        }
        if start.checked_add_days(Days::new(quantities.len() as u64)).is_none() {
            return Err(DomainError::invariant("daily series runs past the last representable date"));
        }
        Ok(Self {
            product_id,
            start: Some(start),
            quantities,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.start.filter(|_| !self.quantities.is_empty())
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.date_at(self.quantities.len().checked_sub(1)?)
    }

    /// Date of the observation at `index` (may be past the end of the series).
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.start?.checked_add_days(Days::new(index as u64))
    }

    /// Raw quantities in date order.
    pub fn values(&self) -> &[f64] {
        &self.quantities
    }

    pub fn points(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        self.start
            .into_iter()
            .flat_map(|start| start.iter_days())
            .zip(self.quantities.iter().copied())
            .map(|(date, quantity)| SeriesPoint { date, quantity })
    }

    /// Total demand over the whole series (usage frequency).
    pub fn total(&self) -> f64 {
        // Folded from +0.0: an empty `sum()` of f64 is -0.0.
        self.quantities.iter().fold(0.0, |acc, q| acc + q)
    }

    /// Split chronologically: `[0, at)` and `[at, len)`.
    ///
    /// `at` is clamped to the series length.
    pub fn split_at(&self, at: usize) -> (DailySeries, DailySeries) {
        let at = at.min(self.quantities.len());
        let (head, tail) = self.quantities.split_at(at);

        let head_series = match self.start {
            Some(start) if !head.is_empty() => Self {
                product_id: self.product_id,
                start: Some(start),
                quantities: head.to_vec(),
            },
            _ => Self::empty(self.product_id),
        };
        let tail_series = match self.date_at(at) {
            Some(start) if !tail.is_empty() => Self {
                product_id: self.product_id,
                start: Some(start),
                quantities: tail.to_vec(),
            },
            _ => Self::empty(self.product_id),
        };

        (head_series, tail_series)
    }
}

/// Builds regular daily series out of raw sales records.
#[derive(Debug, Default, Copy, Clone)]
pub struct SalesSeriesBuilder;

impl SalesSeriesBuilder {
    /// Daily series for `product_id` covering every day from its first to its
    /// last recorded sale (inclusive).
    ///
    /// Same-day quantities are summed, days without sales are zero. Records of
    /// other products are ignored. No records yields an empty series.
    pub fn build<'a, I>(product_id: ProductId, records: I) -> DomainResult<DailySeries>
    where
        I: IntoIterator<Item = &'a SalesRecord>,
    {
        let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for record in records.into_iter().filter(|r| r.product_id == product_id) {
            record.validate()?;
            *by_day.entry(record.sale_date).or_insert(0.0) += record.quantity_sold;
        }

        let (Some((&first, _)), Some((&last, _))) = (by_day.first_key_value(), by_day.last_key_value()) else {
            return Ok(DailySeries::empty(product_id));
        };

        let days = (last - first).num_days() as usize + 1;
        let mut quantities = vec![0.0; days];
        for (date, quantity) in by_day {
            quantities[(date - first).num_days() as usize] = quantity;
        }

        DailySeries::from_start(product_id, first, quantities)
    }
}

/// Sales ledger grouped by product, for building many series from one read.
#[derive(Debug, Clone, Default)]
pub struct SalesIndex {
    by_product: HashMap<ProductId, Vec<SalesRecord>>,
}

impl SalesIndex {
    pub fn from_records(records: impl IntoIterator<Item = SalesRecord>) -> Self {
        let mut by_product: HashMap<ProductId, Vec<SalesRecord>> = HashMap::new();
        for record in records {
            by_product.entry(record.product_id).or_default().push(record);
        }
        Self { by_product }
    }

    pub fn records_for(&self, product_id: ProductId) -> &[SalesRecord] {
        self.by_product.get(&product_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn series_for(&self, product_id: ProductId) -> DomainResult<DailySeries> {
        SalesSeriesBuilder::build(product_id, self.records_for(product_id))
    }

    /// Move a product's records out of the index (empty if it has none).
    pub fn take(&mut self, product_id: ProductId) -> Vec<SalesRecord> {
        self.by_product.remove(&product_id).unwrap_or_default()
    }

    pub fn product_count(&self) -> usize {
        self.by_product.len()
    }
}
