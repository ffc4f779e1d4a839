use crate::error::IndicatorError;
use crate::series::PriceSeries;
use chrono::NaiveDate;
use core_types::{ensure_non_negative, ensure_positive};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use ta::Next;
use ta::indicators::ExponentialMovingAverage as Ema;

/// Differences smaller than this are treated as RS == EMA.
const NOISE: f64 = 1e-12;

/// Crossover classification of (RS - EMA) between two evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverSignal {
    NoSignal,
    /// RS moved from at-or-below its EMA to above it.
    Bullish,
    /// RS moved from above its EMA to at-or-below it.
    Bearish,
}

/// The outcome of one evaluation, with the values that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeStrengthReading {
    pub date: NaiveDate,
    pub signal: CrossoverSignal,
    pub relative_strength: f64,
    pub ema: f64,
}

/// Per-instrument state carried between evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeStrengthState {
    pub series: PriceSeries,
    pub previous_rs: f64,
    pub previous_ema: f64,
    pub initialized: bool,
}

/// Tracks an instrument's price relative to a benchmark and flags trend reversals.
///
/// The ratio series is smoothed with an EMA seeded from its first observation.
/// A crossover fires when the sign of (RS - EMA) flips between evaluations.
#[derive(Debug, Clone)]
pub struct RelativeStrengthEngine {
    state: RelativeStrengthState,
    ema_period: usize,
}

impl RelativeStrengthEngine {
    pub const DEFAULT_WINDOW: usize = 200;
    pub const DEFAULT_EMA_PERIOD: usize = 20;

    pub fn new(window: usize, ema_period: usize) -> Result<Self, IndicatorError> {
        // Fail at construction rather than on the first evaluation.
        Ema::new(ema_period).map_err(|e| {
            IndicatorError::InvalidParameters(format!("Failed to initialize EMA: {:?}", e))
        })?;

        Ok(Self {
            state: RelativeStrengthState {
                series: PriceSeries::new(window)?,
                previous_rs: 0.0,
                previous_ema: 0.0,
                initialized: false,
            },
            ema_period,
        })
    }

    /// Feeds one (instrument, benchmark) close pair for `date`.
    ///
    /// The first evaluation only records state. Later ones compare against the
    /// previous evaluation; the previous values are then replaced whether or
    /// not a crossover fired.
    pub fn evaluate(
        &mut self,
        date: NaiveDate,
        price: Decimal,
        benchmark: Decimal,
    ) -> Result<RelativeStrengthReading, IndicatorError> {
        let price = ensure_non_negative(price, "price")?;
        let benchmark = ensure_positive(benchmark, "benchmark price")?;

        let ratio = price.checked_div(benchmark).ok_or_else(|| {
            IndicatorError::InvalidInput(format!("{price} / {benchmark} is outside the decimal range"))
        })?;
        self.state.series.add_value(date, ratio);
        let (relative_strength, ema) = self.current_values()?;

        let signal = if self.state.initialized {
            let was_above = self.state.previous_rs - self.state.previous_ema > NOISE;
            let is_above = relative_strength - ema > NOISE;
            match (was_above, is_above) {
                (false, true) => CrossoverSignal::Bullish,
                (true, false) => CrossoverSignal::Bearish,
                _ => CrossoverSignal::NoSignal,
            }
        } else {
            CrossoverSignal::NoSignal
        };

        self.state.previous_rs = relative_strength;
        self.state.previous_ema = ema;
        self.state.initialized = true;

        if signal != CrossoverSignal::NoSignal {
            tracing::debug!(?signal, relative_strength, ema, %date, "Relative strength crossover");
        }

        Ok(RelativeStrengthReading {
            date,
            signal,
            relative_strength,
            ema,
        })
    }

    /// The latest ratio and the EMA of the whole ordered ratio series.
    fn current_values(&self) -> Result<(f64, f64), IndicatorError> {
        let mut ema = Ema::new(self.ema_period)
            .map_err(|e| IndicatorError::Calculation(format!("{:?}", e)))?;

        let mut smoothed = None;
        for ratio in self.state.series.values() {
            let ratio = to_f64(ratio)?;
            smoothed = Some(ema.next(ratio));
        }

        let latest = self
            .state
            .series
            .latest()
            .ok_or_else(|| IndicatorError::Calculation("ratio series is empty".to_string()))?;
        let smoothed =
            smoothed.ok_or_else(|| IndicatorError::Calculation("ratio series is empty".to_string()))?;

        Ok((to_f64(latest.price)?, smoothed))
    }

    pub fn state(&self) -> &RelativeStrengthState {
        &self.state
    }
}

fn to_f64(value: Decimal) -> Result<f64, IndicatorError> {
    value
        .to_f64()
        .ok_or_else(|| IndicatorError::Calculation(format!("Failed to convert {} to f64", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, 1).unwrap() + chrono::Days::new(n)
    }

    fn engine() -> RelativeStrengthEngine {
        RelativeStrengthEngine::new(
            RelativeStrengthEngine::DEFAULT_WINDOW,
            RelativeStrengthEngine::DEFAULT_EMA_PERIOD,
        )
        .unwrap()
    }

    #[test]
    fn first_evaluation_only_initializes() {
        let mut rs = engine();
        let reading = rs.evaluate(day(0), dec!(50), dec!(100)).unwrap();

        assert_eq!(reading.signal, CrossoverSignal::NoSignal);
        assert_eq!(reading.relative_strength, 0.5);
        assert_eq!(reading.ema, 0.5);
        assert!(rs.state().initialized);
        assert_eq!(rs.state().previous_rs, 0.5);
    }

    #[test]
    fn detects_bullish_then_bearish_crossovers() {
        let mut rs = engine();
        for n in 0..5 {
            let r = rs.evaluate(day(n), dec!(100), dec!(100)).unwrap();
            assert_eq!(r.signal, CrossoverSignal::NoSignal);
        }
        // Underperforming: RS drops below its EMA, no flip from above.
        let r = rs.evaluate(day(5), dec!(90), dec!(100)).unwrap();
        assert_eq!(r.signal, CrossoverSignal::NoSignal);
        assert!(r.relative_strength < r.ema);

        let r = rs.evaluate(day(6), dec!(120), dec!(100)).unwrap();
        assert_eq!(r.signal, CrossoverSignal::Bullish);
        assert!(r.relative_strength > r.ema);

        let r = rs.evaluate(day(7), dec!(80), dec!(100)).unwrap();
        assert_eq!(r.signal, CrossoverSignal::Bearish);
    }

    #[test]
    fn repeated_evaluation_is_idempotent() {
        let mut rs = engine();
        rs.evaluate(day(0), dec!(100), dec!(100)).unwrap();
        let first = rs.evaluate(day(1), dec!(130), dec!(100)).unwrap();
        assert_eq!(first.signal, CrossoverSignal::Bullish);

        let state_after_first = rs.state().clone();
        let second = rs.evaluate(day(1), dec!(130), dec!(100)).unwrap();

        assert_eq!(second.signal, CrossoverSignal::NoSignal);
        assert_eq!(second.relative_strength, first.relative_strength);
        assert_eq!(second.ema, first.ema);
        assert_eq!(rs.state(), &state_after_first);
    }

    #[test]
    fn rejects_non_positive_benchmark_without_mutating() {
        let mut rs = engine();
        assert!(matches!(
            rs.evaluate(day(0), dec!(10), dec!(0)),
            Err(IndicatorError::InvalidInput(_))
        ));
        assert!(rs.evaluate(day(0), dec!(10), dec!(-5)).is_err());
        assert!(rs.evaluate(day(0), dec!(-10), dec!(5)).is_err());
        assert!(rs.state().series.is_empty());
        assert!(!rs.state().initialized);
    }

    #[test]
    fn overflowing_ratio_is_rejected_without_mutating() {
        let mut rs = engine();
        assert!(matches!(
            rs.evaluate(day(0), dec!(100000000000000000000), dec!(0.0000000001)),
            Err(IndicatorError::InvalidInput(_))
        ));
        assert!(rs.state().series.is_empty());
        assert!(!rs.state().initialized);

        let reading = rs.evaluate(day(0), dec!(95), dec!(0.0000000001)).unwrap();
        assert_eq!(reading.signal, CrossoverSignal::NoSignal);
        assert_eq!(rs.state().series.len(), 1);
    }

    #[test]
    fn window_evicts_exactly_the_oldest_date() {
        let mut rs = engine();
        for n in 0..200 {
            rs.evaluate(day(n), dec!(100) + Decimal::from(n), dec!(100)).unwrap();
        }
        assert_eq!(rs.state().series.len(), 200);
        assert_eq!(rs.state().series.oldest().unwrap().date, day(0));

        rs.evaluate(day(200), dec!(300), dec!(100)).unwrap();

        let series = &rs.state().series;
        assert_eq!(series.len(), 200);
        assert_eq!(series.oldest().unwrap().date, day(1));
        assert_eq!(series.latest().unwrap().date, day(200));
        let dates: Vec<_> = series.points().map(|p| p.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn zero_ema_period_is_rejected() {
        assert!(RelativeStrengthEngine::new(200, 0).is_err());
        assert!(RelativeStrengthEngine::new(0, 20).is_err());
    }
}
