use crate::error::ExecutorError;
use chrono::{DateTime, Utc};
use core_types::{Instrument, Position};
use events::ProfitLoss;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A position that has just been liquidated.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedPosition {
    pub position: Position,
    pub exit_price: Decimal,
    pub proceeds: Decimal,
    pub profit_loss: ProfitLoss,
}

/// Manages the state of the virtual account: cash and open positions.
///
/// Each instrument moves None -> Open (buy) -> closed (sell, full quantity) and
/// may be opened again afterwards. There is no averaging into an open position
/// and no partial sell. Positions are keyed by market and symbol, so an equity
/// and a coin sharing a ticker are tracked apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub cash_balance: Decimal,
    pub positions: BTreeMap<String, Position>,
}

/// The `positions` key for `instrument`, e.g. `crypto:BTC`.
fn position_key(instrument: &Instrument) -> String {
    format!("{}:{}", instrument.market, instrument.symbol)
}

fn out_of_range(what: &str, instrument: &Instrument) -> ExecutorError {
    ExecutorError::InvalidInput(format!("{what} for {instrument} is outside the decimal range"))
}

impl Portfolio {
    /// Creates a new `Portfolio` with a given amount of starting capital.
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            cash_balance: initial_balance,
            positions: BTreeMap::new(),
        }
    }

    /// Spends exactly `amount` on `instrument` at `price`, opening a new position.
    pub fn buy(
        &mut self,
        instrument: &Instrument,
        price: Decimal,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<&Position, ExecutorError> {
        if price <= Decimal::ZERO {
            return Err(ExecutorError::InvalidInput(format!(
                "buy price for {instrument} must be positive, got {price}"
            )));
        }
        if amount <= Decimal::ZERO {
            return Err(ExecutorError::InvalidInput(format!(
                "trade amount must be positive, got {amount}"
            )));
        }
        let key = position_key(instrument);
        if self.positions.contains_key(&key) {
            return Err(ExecutorError::PositionAlreadyOpen(key));
        }
        if self.cash_balance < amount {
            return Err(ExecutorError::InsufficientCash {
                required: amount.to_string(),
                available: self.cash_balance.to_string(),
            });
        }
        let quantity = amount
            .checked_div(price)
            .ok_or_else(|| out_of_range("quantity", instrument))?;

        self.cash_balance -= amount;
        let position = Position {
            symbol: instrument.symbol.clone(),
            market: instrument.market,
            quantity,
            average_price: price,
            opened_at: at,
        };
        Ok(self.positions.entry(key).or_insert(position))
    }

    /// Liquidates the whole position in `instrument` at `price`.
    ///
    /// Returns `Ok(None)` when nothing is open. An error leaves the position open.
    pub fn sell(&mut self, instrument: &Instrument, price: Decimal) -> Result<Option<ClosedPosition>, ExecutorError> {
        if price <= Decimal::ZERO {
            return Err(ExecutorError::InvalidInput(format!(
                "sell price for {instrument} must be positive, got {price}"
            )));
        }
        let key = position_key(instrument);
        let Some(position) = self.positions.get(&key) else {
            return Ok(None);
        };

        let proceeds = position
            .quantity
            .checked_mul(price)
            .ok_or_else(|| out_of_range("proceeds", instrument))?;
        let cash_balance = self
            .cash_balance
            .checked_add(proceeds)
            .ok_or_else(|| out_of_range("cash balance", instrument))?;
        let amount = (price - position.average_price)
            .checked_mul(position.quantity)
            .ok_or_else(|| out_of_range("profit/loss", instrument))?;
        let percent = price
            .checked_div(position.average_price)
            .and_then(|ratio| (ratio - Decimal::ONE).checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| out_of_range("profit/loss percentage", instrument))?;

        let Some(position) = self.positions.remove(&key) else {
            return Ok(None);
        };
        self.cash_balance = cash_balance;
        Ok(Some(ClosedPosition {
            position,
            exit_price: price,
            proceeds,
            profit_loss: ProfitLoss { amount, percent },
        }))
    }

    pub fn get_position(&self, instrument: &Instrument) -> Option<&Position> {
        self.positions.get(&position_key(instrument))
    }

    /// Cash spent on the positions that are still open.
    pub fn invested(&self) -> Decimal {
        self.positions.values().map(Position::cost_basis).sum()
    }

    /// Calculates the total equity of the portfolio at a given set of market prices.
    /// Equity = Cash + Market Value of all open positions.
    pub fn total_equity(&self, market_prices: &HashMap<Instrument, Decimal>) -> Result<Decimal, ExecutorError> {
        let mut equity = self.cash_balance;
        for position in self.positions.values() {
            let instrument = position.instrument();
            let current_price = market_prices.get(&instrument).ok_or_else(|| {
                ExecutorError::InvalidInput(format!("Missing market price for {} ({})", instrument, instrument.market))
            })?;
            equity = position
                .quantity
                .checked_mul(*current_price)
                .and_then(|value| equity.checked_add(value))
                .ok_or_else(|| out_of_range("market value", &instrument))?;
        }
        Ok(equity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn aapl() -> Instrument {
        Instrument::equity("AAPL")
    }

    #[test]
    fn buy_then_sell_round_trip() {
        let mut portfolio = Portfolio::new(dec!(100000));
        let position = portfolio.buy(&aapl(), dec!(200), dec!(200), Utc::now()).unwrap();
        assert_eq!(position.quantity, dec!(1));
        assert_eq!(portfolio.cash_balance, dec!(99800));
        assert!(portfolio.positions.contains_key("equity:AAPL"));

        let closed = portfolio.sell(&aapl(), dec!(220)).unwrap().unwrap();
        assert_eq!(closed.profit_loss.amount, dec!(20));
        assert_eq!(closed.profit_loss.percent, dec!(10));
        assert_eq!(closed.proceeds, dec!(220));
        assert_eq!(portfolio.cash_balance, dec!(100020));
        assert!(portfolio.positions.is_empty());
    }

    #[test]
    fn losing_trade_reports_negative_pnl() {
        let mut portfolio = Portfolio::new(dec!(1000));
        let eth = Instrument::crypto("ETH");
        portfolio.buy(&eth, dec!(400), dec!(800), Utc::now()).unwrap();
        let closed = portfolio.sell(&eth, dec!(300)).unwrap().unwrap();
        assert_eq!(closed.profit_loss.amount, dec!(-200));
        assert_eq!(closed.profit_loss.percent, dec!(-25));
        assert_eq!(portfolio.cash_balance, dec!(800));
    }

    #[test]
    fn rejects_double_buy_and_overspending() {
        let mut portfolio = Portfolio::new(dec!(300));
        portfolio.buy(&aapl(), dec!(100), dec!(200), Utc::now()).unwrap();

        assert!(matches!(
            portfolio.buy(&aapl(), dec!(100), dec!(50), Utc::now()),
            Err(ExecutorError::PositionAlreadyOpen(_))
        ));
        assert!(matches!(
            portfolio.buy(&Instrument::equity("MSFT"), dec!(100), dec!(200), Utc::now()),
            Err(ExecutorError::InsufficientCash { .. })
        ));
        assert_eq!(portfolio.cash_balance, dec!(100));
        assert_eq!(portfolio.positions.len(), 1);
    }

    #[test]
    fn same_ticker_on_two_markets_are_separate_positions() {
        let mut portfolio = Portfolio::new(dec!(1000));
        let equity = Instrument::equity("COIN");
        let crypto = Instrument::crypto("COIN");
        portfolio.buy(&equity, dec!(100), dec!(200), Utc::now()).unwrap();
        portfolio.buy(&crypto, dec!(2), dec!(200), Utc::now()).unwrap();
        assert_eq!(portfolio.positions.len(), 2);
        assert_eq!(portfolio.get_position(&crypto).unwrap().quantity, dec!(100));

        let closed = portfolio.sell(&equity, dec!(110)).unwrap().unwrap();
        assert_eq!(closed.position.market, core_types::MarketType::Equity);
        assert!(portfolio.get_position(&equity).is_none());
        assert_eq!(portfolio.get_position(&crypto).unwrap().average_price, dec!(2));
    }

    #[test]
    fn rejects_non_positive_prices() {
        let mut portfolio = Portfolio::new(dec!(300));
        assert!(matches!(
            portfolio.buy(&aapl(), dec!(0), dec!(200), Utc::now()),
            Err(ExecutorError::InvalidInput(_))
        ));
        assert!(portfolio.sell(&aapl(), dec!(-1)).is_err());
    }

    #[test]
    fn out_of_range_amounts_are_rejected_without_side_effects() {
        let mut portfolio = Portfolio::new(dec!(100000000000000000000));
        assert!(matches!(
            portfolio.buy(&aapl(), dec!(0.0000000001), dec!(100000000000000000000), Utc::now()),
            Err(ExecutorError::InvalidInput(_))
        ));
        assert_eq!(portfolio.cash_balance, dec!(100000000000000000000));
        assert!(portfolio.positions.is_empty());

        portfolio.positions.insert(
            position_key(&aapl()),
            Position {
                symbol: "AAPL".into(),
                market: core_types::MarketType::Equity,
                quantity: Decimal::MAX,
                average_price: dec!(1),
                opened_at: Utc::now(),
            },
        );
        assert!(matches!(portfolio.sell(&aapl(), dec!(2)), Err(ExecutorError::InvalidInput(_))));
        assert!(portfolio.get_position(&aapl()).is_some());
        assert_eq!(portfolio.cash_balance, dec!(100000000000000000000));
    }

    #[test]
    fn selling_nothing_is_a_no_op() {
        let mut portfolio = Portfolio::new(dec!(300));
        assert_eq!(portfolio.sell(&aapl(), dec!(10)).unwrap(), None);
        assert_eq!(portfolio.cash_balance, dec!(300));
    }

    #[test]
    fn equity_marks_positions_to_market() {
        let mut portfolio = Portfolio::new(dec!(1000));
        portfolio.buy(&aapl(), dec!(100), dec!(500), Utc::now()).unwrap();
        assert_eq!(portfolio.invested(), dec!(500));

        let prices = HashMap::from([(aapl(), dec!(110))]);
        assert_eq!(portfolio.total_equity(&prices).unwrap(), dec!(1050));
        assert!(portfolio.total_equity(&HashMap::from([(Instrument::crypto("AAPL"), dec!(110))])).is_err());
    }
}
