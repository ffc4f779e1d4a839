//! # Pricewatch Events
//!
//! The vocabulary shared between the signal engines, the simulator and the
//! alerter: which signals fired, which trades executed, and which failures were
//! isolated along the way.
//!
//! As a Layer 0 crate, it depends only on `core-types`.

// Declare the modules that make up this crate.
pub mod messages;
pub mod reporter;

// Re-export the core types to provide a clean public API.
pub use messages::{
    Failure, FiredSignal, IndicatorSnapshot, ProfitLoss, SignalAlert, SignalKind, Stage,
    TradeExecuted,
};
pub use reporter::{CollectingReporter, ErrorReporter, TracingReporter};
