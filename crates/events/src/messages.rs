use chrono::{DateTime, Utc};
use core_types::{Instrument, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of signal the coordinator can raise for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Price fell to or below the configured buy target.
    TargetBuy,
    /// Price rose to or above the configured sell target.
    TargetSell,
    RsiOverbought,
    RsiOversold,
    /// Relative strength crossed above its EMA.
    BullishCrossover,
    /// Relative strength crossed below its EMA.
    BearishCrossover,
}

impl SignalKind {
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::TargetBuy => "BUY TARGET",
            SignalKind::TargetSell => "SELL TARGET",
            SignalKind::RsiOverbought => "RSI OVERBOUGHT",
            SignalKind::RsiOversold => "RSI OVERSOLD",
            SignalKind::BullishCrossover => "BULLISH CROSSOVER",
            SignalKind::BearishCrossover => "BEARISH CROSSOVER",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            SignalKind::TargetBuy | SignalKind::RsiOversold | SignalKind::BullishCrossover => "📈",
            SignalKind::TargetSell | SignalKind::RsiOverbought | SignalKind::BearishCrossover => {
                "📉"
            }
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One signal that fired, with the human-readable reason behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredSignal {
    pub kind: SignalKind,
    pub reason: String,
}

/// Indicator values captured alongside an alert, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: Option<Decimal>,
    pub relative_strength: Option<f64>,
    pub relative_strength_ema: Option<f64>,
}

/// Everything needed to render a single per-instrument alert message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAlert {
    pub timestamp: DateTime<Utc>,
    pub instrument: Instrument,
    pub price: Decimal,
    pub change_pct: Option<Decimal>,
    pub signals: Vec<FiredSignal>,
    pub indicators: IndicatorSnapshot,
}

/// Realised result of closing a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    pub amount: Decimal,
    pub percent: Decimal,
}

/// A notification that the simulator executed a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExecuted {
    pub transaction: Transaction,
    pub cash_balance: Decimal,
    /// Present on sells only.
    pub profit_loss: Option<ProfitLoss>,
}

/// The processing step in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Fetch,
    Indicators,
    Monitor,
    Notification,
    Simulation,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Indicators => "indicators",
            Stage::Monitor => "monitor",
            Stage::Notification => "notification",
            Stage::Simulation => "simulation",
            Stage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// A structured record of something that went wrong but did not stop the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub timestamp: DateTime<Utc>,
    pub instrument: Option<Instrument>,
    pub stage: Stage,
    pub message: String,
}

impl Failure {
    pub fn new(instrument: Option<Instrument>, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            instrument,
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instrument {
            Some(instrument) => write!(f, "[{}] {}: {}", self.stage, instrument, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}
