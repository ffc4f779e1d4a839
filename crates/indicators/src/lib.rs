//! # Pricewatch Indicator Library
//!
//! Stateful technical indicators fed one daily observation at a time:
//!
//! - `PriceSeries`: the bounded, date-keyed window both engines build on.
//! - `RsiEngine`: relative strength index over the last N closes.
//! - `RelativeStrengthEngine`: instrument/benchmark ratio, EMA smoothing and
//!   crossover detection.
//!
//! This is a pure logic crate. It has no knowledge of quotes, alerts or
//! persistence; each engine instance belongs to exactly one instrument.

pub mod error;
pub mod relative_strength;
pub mod rsi;
pub mod series;

pub use error::IndicatorError;
pub use relative_strength::{
    CrossoverSignal, RelativeStrengthEngine, RelativeStrengthReading, RelativeStrengthState,
};
pub use rsi::{RsiEngine, RsiReading, RsiThresholds, RsiZone};
pub use series::PriceSeries;
