use crate::error::IndicatorError;
use chrono::NaiveDate;
use core_types::DatedPrice;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// A bounded, date-ordered window of prices for one instrument.
///
/// Adding a value for a date that is already present overwrites it. When the
/// window grows past `max_len`, the chronologically oldest entry is evicted.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: BTreeMap<NaiveDate, Decimal>,
    max_len: usize,
}

impl PriceSeries {
    pub fn new(max_len: usize) -> Result<Self, IndicatorError> {
        if max_len == 0 {
            return Err(IndicatorError::InvalidParameters(
                "Price series must retain at least one point".to_string(),
            ));
        }
        Ok(Self {
            points: BTreeMap::new(),
            max_len,
        })
    }

    /// Upserts the value for `date`, then trims the window back to `max_len`.
    pub fn add_value(&mut self, date: NaiveDate, value: Decimal) {
        self.points.insert(date, value);
        while self.points.len() > self.max_len {
            self.points.pop_first();
        }
    }

    /// Values ordered oldest to newest. The iterator can be cloned to walk the
    /// series again without copying it.
    pub fn values(&self) -> impl Iterator<Item = Decimal> + Clone + '_ {
        self.points.values().copied()
    }

    pub fn points(&self) -> impl Iterator<Item = DatedPrice> + '_ {
        self.points
            .iter()
            .map(|(&date, &price)| DatedPrice { date, price })
    }

    /// The most recent observation, or `None` when the series is empty.
    pub fn latest(&self) -> Option<DatedPrice> {
        self.points
            .last_key_value()
            .map(|(&date, &price)| DatedPrice { date, price })
    }

    pub fn oldest(&self) -> Option<DatedPrice> {
        self.points
            .first_key_value()
            .map(|(&date, &price)| DatedPrice { date, price })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
