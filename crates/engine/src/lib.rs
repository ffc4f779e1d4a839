//! # Pricewatch Engine
//!
//! The orchestration layer. Each tick the `SignalCoordinator` pulls a quote per
//! tracked instrument from a `QuoteSource`, feeds the indicator engines held in
//! the `StateContainer`, asks the `ThresholdMonitor` for a decision, dispatches
//! alerts and, when paper trading is on, hands the decision to the simulator.
//!
//! The `Scheduler` drives batches on a fixed interval with an overlap guard.

pub mod coordinator;
pub mod error;
pub mod scheduler;
pub mod sources;
pub mod state;

pub use coordinator::{BatchReport, SignalCoordinator};
pub use error::EngineError;
pub use scheduler::{Scheduler, SchedulerStats};
pub use sources::{QuoteSource, SnapshotQuoteSource, StaticQuoteSource};
pub use state::{InstrumentState, StateContainer};
