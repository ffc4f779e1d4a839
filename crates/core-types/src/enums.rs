use serde::{Deserialize, Serialize};
use std::fmt;

/// The side of a simulated trade as recorded in the transaction ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// The market an instrument trades on. Each market keeps its own target list
/// and, optionally, its own relative-strength benchmark. Documents written
/// without a market tag read as equities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    #[default]
    Equity,
    Crypto,
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketType::Equity => write!(f, "equity"),
            MarketType::Crypto => write!(f, "crypto"),
        }
    }
}

/// The outcome of comparing a live price against configured targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Hold,
    Buy,
    Sell,
}

impl Decision {
    /// Maps an actionable decision onto the trade side it implies.
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Decision::Hold => None,
            Decision::Buy => Some(OrderSide::Buy),
            Decision::Sell => Some(OrderSide::Sell),
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Decision::Hold)
    }
}
