pub mod enums;
pub mod error;
pub mod price;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Decision, MarketType, OrderSide};
pub use error::CoreError;
pub use price::{decimal_from_f64, ensure_non_negative, ensure_positive};
pub use structs::{DatedPrice, Instrument, Position, Quote, Transaction};
