use crate::enums::{MarketType, OrderSide};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The canonical identifier for a tracked instrument.
///
/// Symbols are normalised to upper case so that `aapl` and `AAPL` refer to the
/// same series, target entry and position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub market: MarketType,
}

impl Instrument {
    pub fn new(symbol: impl AsRef<str>, market: MarketType) -> Self {
        Self {
            symbol: symbol.as_ref().trim().to_uppercase(),
            market,
        }
    }

    pub fn equity(symbol: impl AsRef<str>) -> Self {
        Self::new(symbol, MarketType::Equity)
    }

    pub fn crypto(symbol: impl AsRef<str>) -> Self {
        Self::new(symbol, MarketType::Crypto)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A single observation in a price series. At most one exists per date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedPrice {
    pub date: NaiveDate,
    pub price: Decimal,
}

/// An already-parsed quote handed to the core by an acquisition collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub market: MarketType,
    pub current_price: Decimal,
    #[serde(default)]
    pub open: Option<Decimal>,
    #[serde(default)]
    pub high: Option<Decimal>,
    #[serde(default)]
    pub low: Option<Decimal>,
    #[serde(default)]
    pub previous_close: Option<Decimal>,
    pub date: NaiveDate,
}

impl Quote {
    pub fn instrument(&self) -> Instrument {
        Instrument::new(&self.symbol, self.market)
    }

    /// Percentage change against the previous close, when one was supplied.
    pub fn change_pct(&self) -> Option<Decimal> {
        let previous = self.previous_close.filter(|p| !p.is_zero())?;
        self.current_price
            .checked_div(previous)?
            .checked_sub(Decimal::ONE)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }
}

/// An open paper-trading position. Only exists while `quantity > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    #[serde(default)]
    pub market: MarketType,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn instrument(&self) -> Instrument {
        Instrument::new(&self.symbol, self.market)
    }

    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.average_price
    }
}

/// An immutable ledger record for an executed simulated trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub symbol: String,
    #[serde(default)]
    pub market: MarketType,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

impl Transaction {
    pub fn new(
        instrument: &Instrument,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: instrument.symbol.clone(),
            market: instrument.market,
            side,
            quantity,
            price,
            timestamp,
            reason: reason.into(),
        }
    }

    pub fn instrument(&self) -> Instrument {
        Instrument::new(&self.symbol, self.market)
    }

    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}
