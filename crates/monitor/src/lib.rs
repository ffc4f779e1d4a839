//! # Pricewatch Threshold Monitor
//!
//! Target-price crossing with a per-symbol cooldown.
//!
//! - `TargetBook`: a market's JSON list of buy/sell targets, updatable in place.
//! - `IgnoreList`: in-memory cooldown entries.
//! - `ThresholdMonitor`: turns a live price into a `Decision`.

pub mod cooldown;
pub mod error;
pub mod targets;
pub mod threshold;

pub use cooldown::IgnoreList;
pub use error::MonitorError;
pub use targets::{TargetBook, TargetPrice};
pub use threshold::ThresholdMonitor;
