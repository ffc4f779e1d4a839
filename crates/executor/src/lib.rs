//! # Pricewatch Executor Crate
//!
//! Paper trading for the signal engine. The `Portfolio` is the state machine
//! for cash and open positions; the `PortfolioSimulator` wraps it with the
//! transaction ledger, JSON persistence and trade confirmations.
//!
//! ## Architectural Principles
//!
//! - **State vs. Side Effects:** `Portfolio` only does arithmetic and state
//!   transitions, so it can be tested without a filesystem. The simulator owns
//!   every side effect (documents, notifications, failure reporting).
//! - **Single Writer:** The simulator is the only component that touches the
//!   portfolio and ledger documents. Callers serialize access to it.
//!
//! ## Public API
//!
//! - `Portfolio`: cash balance plus open positions keyed by market and symbol.
//! - `PortfolioSimulator`: executes buys and sells and persists the result.
//! - `JsonStore`: whole-document JSON persistence; `read_ledger` reads the ledger leniently.
//! - `ExecutorError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod portfolio;
pub mod simulator;
pub mod store;

// Re-export the key components to provide a clean, public-facing API.
pub use error::ExecutorError;
pub use portfolio::{ClosedPosition, Portfolio};
pub use simulator::{PortfolioSimulator, PortfolioSummary, read_ledger};
pub use store::JsonStore;
