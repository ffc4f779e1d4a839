use crate::error::ExecutorError;
use crate::portfolio::Portfolio;
use crate::store::JsonStore;
use alerter::{Notifier, format_trade_confirmation};
use chrono::Utc;
use configuration::Simulation;
use core_types::{Decision, Instrument, OrderSide, Position, Transaction};
use events::{ErrorReporter, Failure, Stage, TradeExecuted};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Aggregate view of the virtual account, for the CLI and the logs.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub cash_balance: Decimal,
    pub invested: Decimal,
    pub realized_pnl: Decimal,
    pub trades: usize,
    pub positions: Vec<Position>,
}

/// Paper-trades on behalf of the coordinator.
///
/// Owns the portfolio and the transaction ledger. Every mutation is persisted
/// before the confirmation goes out. Persistence failures are logged and
/// reported, and the in-memory state stays authoritative for the session.
pub struct PortfolioSimulator {
    portfolio: Portfolio,
    ledger: Vec<Transaction>,
    portfolio_store: JsonStore,
    ledger_store: JsonStore,
    trade_amount: Decimal,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn ErrorReporter>,
}

impl PortfolioSimulator {
    /// Loads the portfolio and ledger documents, initializing whatever is missing.
    ///
    /// An absent or unreadable portfolio is replaced with a fresh one at the
    /// configured initial balance and written back immediately. An unreadable
    /// ledger starts empty.
    pub async fn load(
        settings: &Simulation,
        notifier: Arc<dyn Notifier>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let portfolio_store = JsonStore::new(&settings.portfolio_path);
        let ledger_store = JsonStore::new(&settings.ledger_path);

        let (portfolio, fresh) = match portfolio_store.load::<Portfolio>().await {
            Ok(Some(portfolio)) => (portfolio, false),
            Ok(None) => {
                tracing::info!(
                    path = %portfolio_store.path().display(),
                    balance = %settings.initial_balance,
                    "No portfolio found, starting a fresh one."
                );
                (Portfolio::new(settings.initial_balance), true)
            }
            Err(e) => {
                tracing::warn!(
                    path = %portfolio_store.path().display(),
                    error = %e,
                    "Portfolio is unreadable, starting a fresh one."
                );
                reporter.report(Failure::new(
                    None,
                    Stage::Persistence,
                    format!("portfolio unreadable, reinitialized: {e}"),
                ));
                (Portfolio::new(settings.initial_balance), true)
            }
        };

        let (ledger, error) = read_ledger(&ledger_store).await;
        if let Some(e) = error {
            reporter.report(Failure::new(
                None,
                Stage::Persistence,
                format!("ledger unreadable, starting empty: {e}"),
            ));
        }

        let simulator = Self {
            portfolio,
            ledger,
            portfolio_store,
            ledger_store,
            trade_amount: settings.trade_amount,
            notifier,
            reporter,
        };
        if fresh {
            simulator.save_portfolio(None).await;
        }
        tracing::info!(
            cash = %simulator.portfolio.cash_balance,
            positions = simulator.portfolio.positions.len(),
            transactions = simulator.ledger.len(),
            "Portfolio simulator ready."
        );
        simulator
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn ledger(&self) -> &[Transaction] {
        &self.ledger
    }

    pub fn trade_amount(&self) -> Decimal {
        self.trade_amount
    }

    /// Routes a monitor decision to a buy or a sell. `Hold` does nothing.
    pub async fn execute(
        &mut self,
        decision: Decision,
        instrument: &Instrument,
        price: Decimal,
        reason: &str,
    ) -> Result<Option<Transaction>, ExecutorError> {
        match decision.side() {
            Some(OrderSide::Buy) => self.execute_buy(instrument, price, reason).await.map(Some),
            Some(OrderSide::Sell) => self.execute_sell(instrument, price, reason).await,
            None => Ok(None),
        }
    }

    /// Opens a position worth the configured trade amount.
    pub async fn execute_buy(
        &mut self,
        instrument: &Instrument,
        price: Decimal,
        reason: &str,
    ) -> Result<Transaction, ExecutorError> {
        let now = Utc::now();
        let quantity = self
            .portfolio
            .buy(instrument, price, self.trade_amount, now)?
            .quantity;

        let transaction =
            Transaction::new(instrument, OrderSide::Buy, quantity, price, now, reason);
        tracing::info!(
            symbol = %instrument,
            %quantity,
            %price,
            cash = %self.portfolio.cash_balance,
            "Simulated BUY executed."
        );
        self.record(instrument, transaction.clone()).await;

        let trade = TradeExecuted {
            transaction: transaction.clone(),
            cash_balance: self.portfolio.cash_balance,
            profit_loss: None,
        };
        self.confirm(instrument, &trade).await;
        Ok(transaction)
    }

    /// Closes the open position in full. Returns `Ok(None)` when there is nothing to sell.
    pub async fn execute_sell(
        &mut self,
        instrument: &Instrument,
        price: Decimal,
        reason: &str,
    ) -> Result<Option<Transaction>, ExecutorError> {
        let Some(closed) = self.portfolio.sell(instrument, price)? else {
            tracing::info!(symbol = %instrument, "No open position to sell, ignoring sell signal.");
            return Ok(None);
        };

        let transaction = Transaction::new(
            instrument,
            OrderSide::Sell,
            closed.position.quantity,
            price,
            Utc::now(),
            reason,
        );
        tracing::info!(
            symbol = %instrument,
            quantity = %closed.position.quantity,
            %price,
            pnl = %closed.profit_loss.amount,
            pnl_pct = %closed.profit_loss.percent.round_dp(2),
            cash = %self.portfolio.cash_balance,
            "Simulated SELL executed."
        );
        self.record(instrument, transaction.clone()).await;

        let trade = TradeExecuted {
            transaction: transaction.clone(),
            cash_balance: self.portfolio.cash_balance,
            profit_loss: Some(closed.profit_loss),
        };
        self.confirm(instrument, &trade).await;
        Ok(Some(transaction))
    }

    /// Builds the account overview, including profit realized across the whole ledger.
    pub fn summary(&self) -> PortfolioSummary {
        PortfolioSummary {
            cash_balance: self.portfolio.cash_balance,
            invested: self.portfolio.invested(),
            realized_pnl: realized_pnl(&self.ledger),
            trades: self.ledger.len(),
            positions: self.portfolio.positions.values().cloned().collect(),
        }
    }

    async fn record(&mut self, instrument: &Instrument, transaction: Transaction) {
        self.ledger.push(transaction);
        self.save_portfolio(Some(instrument)).await;
        if let Err(e) = self.ledger_store.save(&self.ledger).await {
            self.persistence_failed(Some(instrument), "transaction ledger", e);
        }
    }

    async fn save_portfolio(&self, instrument: Option<&Instrument>) {
        if let Err(e) = self.portfolio_store.save(&self.portfolio).await {
            self.persistence_failed(instrument, "portfolio", e);
        }
    }

    fn persistence_failed(&self, instrument: Option<&Instrument>, what: &str, error: ExecutorError) {
        tracing::error!(error = %error, "Failed to persist {what}, keeping in-memory state.");
        self.reporter.report(Failure::new(
            instrument.cloned(),
            Stage::Persistence,
            format!("failed to persist {what}: {error}"),
        ));
    }

    async fn confirm(&self, instrument: &Instrument, trade: &TradeExecuted) {
        let message = format_trade_confirmation(trade);
        if let Err(e) = self.notifier.send_message(&message).await {
            self.reporter.report(Failure::new(
                Some(instrument.clone()),
                Stage::Notification,
                format!("trade confirmation not delivered: {e}"),
            ));
        }
    }
}

/// Reads a transaction ledger. A missing ledger is empty. An unreadable one is
/// logged and read as empty, and the error is handed back for reporting.
pub async fn read_ledger(store: &JsonStore) -> (Vec<Transaction>, Option<ExecutorError>) {
    match store.load::<Vec<Transaction>>().await {
        Ok(ledger) => (ledger.unwrap_or_default(), None),
        Err(e) => {
            tracing::warn!(
                path = %store.path().display(),
                error = %e,
                "Transaction ledger is unreadable, starting empty."
            );
            (Vec::new(), Some(e))
        }
    }
}

/// Sums the profit of every completed round trip in the ledger.
fn realized_pnl(ledger: &[Transaction]) -> Decimal {
    let mut entries: HashMap<Instrument, Decimal> = HashMap::new();
    let mut realized = Decimal::ZERO;
    for tx in ledger {
        match tx.side {
            OrderSide::Buy => {
                entries.insert(tx.instrument(), tx.price);
            }
            OrderSide::Sell => {
                if let Some(entry) = entries.remove(&tx.instrument()) {
                    realized += (tx.price - entry) * tx.quantity;
                }
            }
        }
    }
    realized
}
