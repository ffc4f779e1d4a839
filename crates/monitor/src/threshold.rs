use crate::cooldown::IgnoreList;
use crate::error::MonitorError;
use crate::targets::{TargetBook, TargetPrice};
use chrono::{DateTime, Duration, Utc};
use core_types::{Decision, Instrument, MarketType};
use rust_decimal::Decimal;

/// Compares live prices against each market's target list.
///
/// A symbol that produced a decision is muted for the cooldown window, so a
/// price hovering around its target does not alert on every tick.
#[derive(Debug, Clone)]
pub struct ThresholdMonitor {
    equity_targets: TargetBook,
    crypto_targets: TargetBook,
    ignored: IgnoreList,
}

impl ThresholdMonitor {
    pub fn new(equity_targets: TargetBook, crypto_targets: TargetBook, cooldown: Duration) -> Self {
        Self {
            equity_targets,
            crypto_targets,
            ignored: IgnoreList::new(cooldown),
        }
    }

    /// Evaluates `price` as observed at `now`.
    ///
    /// Buy is checked first, so a misconfigured pair with `buy > sell` resolves to Buy.
    pub fn evaluate_at(&mut self, instrument: &Instrument, price: Decimal, now: DateTime<Utc>) -> Decision {
        let Some(target) = self.targets(instrument.market).get(&instrument.symbol) else {
            return Decision::Hold;
        };
        if self.ignored.is_ignored(instrument, now) {
            tracing::debug!(symbol = %instrument, "Symbol is cooling down, skipping targets.");
            return Decision::Hold;
        }

        let decision = if price <= target.buy_target {
            Decision::Buy
        } else if price >= target.sell_target {
            Decision::Sell
        } else {
            Decision::Hold
        };

        if decision.is_actionable() {
            tracing::info!(symbol = %instrument, %price, ?decision,
                buy = %target.buy_target, sell = %target.sell_target, "Target price reached.");
            self.ignored.ignore(instrument, now);
        }
        decision
    }

    /// Removes cooldown entries older than the window.
    pub fn cleanup_at(&mut self, now: DateTime<Utc>) -> usize {
        let removed = self.ignored.cleanup(now);
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "Cooldown entries expired.");
        }
        removed.len()
    }

    pub fn is_ignored(&self, instrument: &Instrument, now: DateTime<Utc>) -> bool {
        self.ignored.is_ignored(instrument, now)
    }

    /// Ends the cooldown for `instrument` early.
    pub fn release(&mut self, instrument: &Instrument) -> bool {
        self.ignored.release(instrument)
    }

    pub fn target(&self, instrument: &Instrument) -> Option<&TargetPrice> {
        self.targets(instrument.market).get(&instrument.symbol)
    }

    pub fn targets(&self, market: MarketType) -> &TargetBook {
        match market {
            MarketType::Equity => &self.equity_targets,
            MarketType::Crypto => &self.crypto_targets,
        }
    }

    /// Re-reads both markets' target documents so edits made while the engine
    /// runs take effect. Neither book changes unless both documents parse.
    pub fn reload_targets(&mut self) -> Result<bool, MonitorError> {
        let mut equity = self.equity_targets.clone();
        let mut crypto = self.crypto_targets.clone();
        let changed = equity.reload()? | crypto.reload()?;
        self.equity_targets = equity;
        self.crypto_targets = crypto;
        Ok(changed)
    }

    pub fn cooldown(&self) -> Duration {
        self.ignored.cooldown()
    }
}
