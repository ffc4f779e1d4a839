use crate::error::IndicatorError;
use crate::series::PriceSeries;
use chrono::NaiveDate;
use core_types::{decimal_from_f64, ensure_non_negative};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The result of an RSI computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiReading {
    /// Fewer than two closes are available. Not an error, just no signal.
    InsufficientHistory,
    Value(Decimal),
}

impl RsiReading {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            RsiReading::InsufficientHistory => None,
            RsiReading::Value(v) => Some(*v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

/// The overbought/oversold boundaries, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsiThresholds {
    pub overbought: Decimal,
    pub oversold: Decimal,
}

impl Default for RsiThresholds {
    fn default() -> Self {
        Self {
            overbought: dec!(70),
            oversold: dec!(30),
        }
    }
}

impl RsiThresholds {
    pub fn classify(&self, rsi: Decimal) -> RsiZone {
        if rsi >= self.overbought {
            RsiZone::Overbought
        } else if rsi <= self.oversold {
            RsiZone::Oversold
        } else {
            RsiZone::Neutral
        }
    }
}

/// Relative Strength Index over a rolling window of daily closes.
///
/// Gains and losses are simple averages over the whole window; there is no
/// Wilder seed/smoothing phase. One engine per instrument.
#[derive(Debug, Clone)]
pub struct RsiEngine {
    closes: PriceSeries,
    thresholds: RsiThresholds,
}

impl RsiEngine {
    pub const DEFAULT_PERIOD: usize = 14;

    pub fn new(period: usize, thresholds: RsiThresholds) -> Result<Self, IndicatorError> {
        if period < 2 {
            return Err(IndicatorError::InvalidParameters(
                "RSI period must cover at least two closes".to_string(),
            ));
        }
        if thresholds.oversold >= thresholds.overbought {
            return Err(IndicatorError::InvalidParameters(
                "RSI oversold threshold must be below the overbought threshold".to_string(),
            ));
        }
        Ok(Self {
            closes: PriceSeries::new(period)?,
            thresholds,
        })
    }

    /// Records the close for `date` and returns the updated reading.
    ///
    /// Negative prices, and closes whose gains or losses leave the decimal
    /// range, are rejected and leave the series untouched.
    pub fn add_close(&mut self, date: NaiveDate, close: Decimal) -> Result<RsiReading, IndicatorError> {
        let close = ensure_non_negative(close, "close")?;
        let mut closes = self.closes.clone();
        closes.add_value(date, close);
        let reading = Self::compute(&closes)?;
        self.closes = closes;
        Ok(reading)
    }

    /// Same as [`RsiEngine::add_close`] for float sources; NaN and infinities are rejected.
    pub fn add_close_f64(&mut self, date: NaiveDate, close: f64) -> Result<RsiReading, IndicatorError> {
        let close = decimal_from_f64(close, "close")?;
        self.add_close(date, close)
    }

    /// Computes RSI from the closes currently in the window.
    pub fn reading(&self) -> Result<RsiReading, IndicatorError> {
        Self::compute(&self.closes)
    }

    fn compute(closes: &PriceSeries) -> Result<RsiReading, IndicatorError> {
        if closes.len() < 2 {
            return Ok(RsiReading::InsufficientHistory);
        }
        let overflow = || IndicatorError::Calculation("RSI gains or losses exceed the decimal range".to_string());

        let values = closes.values();
        let (gains, losses) = values
            .clone()
            .zip(values.skip(1))
            .try_fold((Decimal::ZERO, Decimal::ZERO), |(gains, losses), (prev, next)| {
                let delta = next - prev;
                if delta > Decimal::ZERO {
                    Some((gains.checked_add(delta)?, losses))
                } else {
                    Some((gains, losses.checked_sub(delta)?))
                }
            })
            .ok_or_else(overflow)?;

        // Both averages share the same divisor, so the ratio of the sums is RS.
        if losses.is_zero() {
            return Ok(RsiReading::Value(Decimal::ONE_HUNDRED));
        }
        let rsi = gains
            .checked_div(losses)
            .and_then(|rs| Decimal::ONE.checked_add(rs))
            .and_then(|d| Decimal::ONE_HUNDRED.checked_div(d))
            .map(|d| Decimal::ONE_HUNDRED - d)
            .ok_or_else(overflow)?;
        Ok(RsiReading::Value(rsi))
    }

    pub fn zone(&self) -> Option<RsiZone> {
        let rsi = self.reading().ok()?.value()?;
        Some(self.thresholds.classify(rsi))
    }

    pub fn thresholds(&self) -> RsiThresholds {
        self.thresholds
    }

    pub fn closes(&self) -> &PriceSeries {
        &self.closes
    }
}
