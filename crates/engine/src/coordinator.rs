use crate::error::EngineError;
use crate::sources::QuoteSource;
use crate::state::StateContainer;
use alerter::{Notifier, format_failure, format_signal_alert};
use chrono::{DateTime, Utc};
use configuration::{Config, Feature, FeatureFlags};
use core_types::{Decision, Instrument, MarketType, Quote, ensure_positive};
use events::{ErrorReporter, Failure, FiredSignal, IndicatorSnapshot, SignalAlert, SignalKind, Stage};
use executor::PortfolioSimulator;
use indicators::{CrossoverSignal, RelativeStrengthReading, RsiZone};
use monitor::{IgnoreList, ThresholdMonitor};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Counters for one evaluation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub evaluated: usize,
    pub alerts_sent: usize,
    pub trades: usize,
    pub failures: usize,
}

/// What happened to a single instrument during a batch.
#[derive(Debug, Default)]
struct Outcome {
    alert_sent: bool,
    traded: bool,
    failed: bool,
}

/// Runs the per-tick pipeline: quote, indicators, targets, alert, paper trade.
///
/// Instruments are evaluated one after another. A failure is reported and
/// turned into a short alert, and the batch moves on to the next instrument.
///
/// Indicator alerts keep their own cooldown. Muting an RSI or crossover alert
/// never hides a target crossing from the threshold monitor.
pub struct SignalCoordinator {
    instruments: Vec<Instrument>,
    benchmarks: HashMap<MarketType, Instrument>,
    fetch_timeout: Duration,
    state: StateContainer,
    monitor: ThresholdMonitor,
    indicator_cooldown: IgnoreList,
    simulator: Option<PortfolioSimulator>,
    source: Arc<dyn QuoteSource>,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn ErrorReporter>,
    features: Arc<dyn FeatureFlags>,
}

impl SignalCoordinator {
    pub fn new(
        config: &Config,
        monitor: ThresholdMonitor,
        source: Arc<dyn QuoteSource>,
        notifier: Arc<dyn Notifier>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let benchmarks = [MarketType::Equity, MarketType::Crypto]
            .into_iter()
            .filter_map(|market| Some((market, config.instruments.benchmark(market)?)))
            .collect();
        let indicator_cooldown = IgnoreList::new(monitor.cooldown());

        Self {
            instruments: config.instruments.tracked(),
            benchmarks,
            fetch_timeout: config.schedule.fetch_timeout(),
            state: StateContainer::new(config.indicators.clone()),
            monitor,
            indicator_cooldown,
            simulator: None,
            source,
            notifier,
            reporter,
            features: Arc::new(config.features.clone()),
        }
    }

    /// Replaces the config-backed feature toggles.
    pub fn with_features(mut self, features: Arc<dyn FeatureFlags>) -> Self {
        self.features = features;
        self
    }

    /// Attaches the paper-trading simulator. Trades are only placed while
    /// `Feature::PaperTrading` is enabled.
    pub fn with_simulator(mut self, simulator: PortfolioSimulator) -> Self {
        self.simulator = Some(simulator);
        self
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn state(&self) -> &StateContainer {
        &self.state
    }

    pub fn monitor(&self) -> &ThresholdMonitor {
        &self.monitor
    }

    pub fn simulator(&self) -> Option<&PortfolioSimulator> {
        self.simulator.as_ref()
    }

    /// Whether alerts for `instrument` are currently suppressed.
    pub fn is_muted(&self, instrument: &Instrument, now: DateTime<Utc>) -> bool {
        self.monitor.is_ignored(instrument, now) || self.indicator_cooldown.is_ignored(instrument, now)
    }

    /// Ends every cooldown for `instrument` early.
    pub fn release(&mut self, instrument: &Instrument) -> bool {
        let targets = self.monitor.release(instrument);
        let indicators = self.indicator_cooldown.release(instrument);
        targets || indicators
    }

    /// Expires old cooldown entries. Returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_at(Utc::now())
    }

    pub fn cleanup_at(&mut self, now: DateTime<Utc>) -> usize {
        self.monitor.cleanup_at(now) + self.indicator_cooldown.cleanup(now).len()
    }

    /// Evaluates every tracked instrument once.
    pub async fn run_batch(&mut self) -> BatchReport {
        self.run_batch_at(Utc::now()).await
    }

    pub async fn run_batch_at(&mut self, now: DateTime<Utc>) -> BatchReport {
        let mut report = BatchReport::default();
        if let Err(e) = self.monitor.reload_targets() {
            let error = EngineError::from(e);
            report.failures += 1;
            tracing::warn!(error = %error, "Target lists unreadable, keeping the previous targets.");
            self.report_failure(None, error.stage(), error.to_string()).await;
        }
        let benchmark_prices = self.fetch_benchmarks().await;

        let instruments = self.instruments.clone();
        for instrument in &instruments {
            report.evaluated += 1;
            match self.evaluate_instrument(instrument, &benchmark_prices, now).await {
                Ok(outcome) => {
                    report.alerts_sent += usize::from(outcome.alert_sent);
                    report.trades += usize::from(outcome.traded);
                    report.failures += usize::from(outcome.failed);
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(symbol = %instrument, error = %e, "Evaluation failed, continuing batch.");
                    self.report_failure(Some(instrument.clone()), e.stage(), e.to_string()).await;
                }
            }
        }

        tracing::info!(
            evaluated = report.evaluated,
            alerts = report.alerts_sent,
            trades = report.trades,
            failures = report.failures,
            "Batch complete."
        );
        report
    }

    /// Fetches each market's benchmark once per batch. Failures are kept per market
    /// so that every dependent instrument can report why it was skipped.
    async fn fetch_benchmarks(&self) -> HashMap<MarketType, Result<Decimal, String>> {
        let mut prices = HashMap::new();
        for (market, benchmark) in &self.benchmarks {
            let price = match self.fetch(benchmark).await {
                Ok(quote) => ensure_positive(quote.current_price, "benchmark price")
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(reason) = &price {
                tracing::warn!(benchmark = %benchmark, %reason, "Benchmark price unavailable.");
            }
            prices.insert(*market, price);
        }
        prices
    }

    async fn fetch(&self, instrument: &Instrument) -> Result<Quote, EngineError> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch_quote(instrument)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                symbol: instrument.symbol.clone(),
                secs: self.fetch_timeout.as_secs(),
            }),
        }
    }

    async fn evaluate_instrument(
        &mut self,
        instrument: &Instrument,
        benchmark_prices: &HashMap<MarketType, Result<Decimal, String>>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, EngineError> {
        let quote = self.fetch(instrument).await?;
        let price = ensure_positive(quote.current_price, "current price")?;

        // An instrument is never compared against itself.
        let benchmark_price = match self.benchmarks.get(&instrument.market) {
            Some(benchmark) if benchmark != instrument => {
                match benchmark_prices.get(&instrument.market) {
                    Some(Ok(price)) => Some(*price),
                    Some(Err(reason)) => {
                        return Err(EngineError::MissingBenchmark {
                            benchmark: benchmark.symbol.clone(),
                            reason: reason.clone(),
                        });
                    }
                    None => {
                        return Err(EngineError::MissingBenchmark {
                            benchmark: benchmark.symbol.clone(),
                            reason: "not fetched".to_string(),
                        });
                    }
                }
            }
            _ => None,
        };

        let (rsi, rsi_zone, relative_strength) = {
            let state = self.state.entry(instrument)?;
            let rsi = state.rsi.add_close(quote.date, price)?.value();
            let relative_strength = match benchmark_price {
                Some(benchmark) => Some(state.relative_strength.evaluate(quote.date, price, benchmark)?),
                None => None,
            };
            (rsi, state.rsi.zone(), relative_strength)
        };

        let decision = self.monitor.evaluate_at(instrument, price, now);
        let mut signals = Vec::new();
        if let Some(signal) = self.threshold_signal(instrument, decision, price) {
            signals.push(signal);
        }

        // Indicators ride along with a fresh target alert; otherwise they wait out both cooldowns.
        if decision.is_actionable() || !self.is_muted(instrument, now) {
            let indicator_signals = self.indicator_signals(rsi, rsi_zone, relative_strength.as_ref());
            if !indicator_signals.is_empty() {
                self.indicator_cooldown.ignore(instrument, now);
                signals.extend(indicator_signals);
            }
        }

        let mut outcome = Outcome::default();
        if signals.is_empty() {
            tracing::debug!(symbol = %instrument, %price, ?rsi, "No signal.");
            return Ok(outcome);
        }

        let reason = signals
            .iter()
            .map(|s| s.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let alert = SignalAlert {
            timestamp: now,
            instrument: instrument.clone(),
            price,
            change_pct: quote.change_pct(),
            signals,
            indicators: IndicatorSnapshot {
                rsi,
                relative_strength: relative_strength.map(|r| r.relative_strength),
                relative_strength_ema: relative_strength.map(|r| r.ema),
            },
        };
        tracing::info!(
            symbol = %instrument,
            %price,
            signals = ?alert.signals.iter().map(|s| s.kind).collect::<Vec<_>>(),
            "Signal fired."
        );

        match self.notifier.send_message(&format_signal_alert(&alert)).await {
            Ok(()) => outcome.alert_sent = true,
            Err(e) => self.reporter.report(Failure::new(
                Some(instrument.clone()),
                Stage::Notification,
                format!("alert not delivered: {e}"),
            )),
        }

        if decision.is_actionable() && self.features.is_enabled(Feature::PaperTrading) {
            match self.simulator.as_mut() {
                Some(simulator) => match simulator.execute(decision, instrument, price, &reason).await {
                    Ok(trade) => outcome.traded = trade.is_some(),
                    Err(e) => {
                        // The alert already went out; only the trade is lost.
                        let error = EngineError::from(e);
                        tracing::warn!(symbol = %instrument, error = %error, "Simulated trade rejected.");
                        self.report_failure(Some(instrument.clone()), error.stage(), error.to_string())
                            .await;
                        outcome.failed = true;
                    }
                },
                None => tracing::warn!("Paper trading is enabled but no simulator is attached."),
            }
        }
        Ok(outcome)
    }

    fn threshold_signal(&self, instrument: &Instrument, decision: Decision, price: Decimal) -> Option<FiredSignal> {
        let target = self.monitor.target(instrument)?;
        match decision {
            Decision::Buy => Some(FiredSignal {
                kind: SignalKind::TargetBuy,
                reason: format!("price {} at or below buy target {}", price, target.buy_target),
            }),
            Decision::Sell => Some(FiredSignal {
                kind: SignalKind::TargetSell,
                reason: format!("price {} at or above sell target {}", price, target.sell_target),
            }),
            Decision::Hold => None,
        }
    }

    fn indicator_signals(
        &self,
        rsi: Option<Decimal>,
        zone: Option<RsiZone>,
        relative_strength: Option<&RelativeStrengthReading>,
    ) -> Vec<FiredSignal> {
        let mut signals = Vec::new();

        if self.features.is_enabled(Feature::RsiAlerts) {
            if let (Some(rsi), Some(zone)) = (rsi, zone) {
                let rsi = rsi.round_dp(2);
                match zone {
                    RsiZone::Overbought => signals.push(FiredSignal {
                        kind: SignalKind::RsiOverbought,
                        reason: format!("RSI {rsi} is overbought"),
                    }),
                    RsiZone::Oversold => signals.push(FiredSignal {
                        kind: SignalKind::RsiOversold,
                        reason: format!("RSI {rsi} is oversold"),
                    }),
                    RsiZone::Neutral => {}
                }
            }
        }

        if self.features.is_enabled(Feature::RelativeStrengthAlerts) {
            match relative_strength.map(|r| r.signal) {
                Some(CrossoverSignal::Bullish) => signals.push(FiredSignal {
                    kind: SignalKind::BullishCrossover,
                    reason: "relative strength crossed above its EMA".to_string(),
                }),
                Some(CrossoverSignal::Bearish) => signals.push(FiredSignal {
                    kind: SignalKind::BearishCrossover,
                    reason: "relative strength crossed below its EMA".to_string(),
                }),
                Some(CrossoverSignal::NoSignal) | None => {}
            }
        }
        signals
    }

    async fn report_failure(&self, instrument: Option<Instrument>, stage: Stage, message: String) {
        let failure = Failure::new(instrument, stage, message);
        let text = format_failure(&failure);
        self.reporter.report(failure);
        if let Err(e) = self.notifier.send_message(&text).await {
            tracing::warn!(error = %e, "Failed to deliver failure alert.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StaticQuoteSource;
    use alerter::MemoryNotifier;
    use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone};
    use configuration::Features;
    use events::CollectingReporter;
    use monitor::{TargetBook, TargetPrice};
    use rust_decimal_macros::dec;

    struct Harness {
        coordinator: SignalCoordinator,
        source: Arc<StaticQuoteSource>,
        notifier: Arc<MemoryNotifier>,
        reporter: Arc<CollectingReporter>,
    }

    fn config(equities: &[&str], crypto: &[&str], benchmark: Option<&str>) -> Config {
        let mut config = Config::default();
        config.instruments.equities = equities.iter().map(|s| s.to_string()).collect();
        config.instruments.crypto = crypto.iter().map(|s| s.to_string()).collect();
        config.instruments.equity_benchmark = benchmark.map(str::to_string);
        config.features = Features {
            paper_trading: false,
            rsi_alerts: true,
            relative_strength_alerts: true,
        };
        config
    }

    fn harness(config: &Config) -> Harness {
        let equities = TargetBook::from_targets([TargetPrice {
            symbol: "AAPL".into(),
            buy_target: dec!(100),
            sell_target: dec!(150),
        }])
        .unwrap();
        harness_with(config, equities)
    }

    fn harness_with(config: &Config, equities: TargetBook) -> Harness {
        let monitor = ThresholdMonitor::new(equities, TargetBook::default(), ChronoDuration::hours(1));
        let source = Arc::new(StaticQuoteSource::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let reporter = Arc::new(CollectingReporter::new());
        let coordinator =
            SignalCoordinator::new(config, monitor, source.clone(), notifier.clone(), reporter.clone());
        Harness { coordinator, source, notifier, reporter }
    }

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + ChronoDuration::days(n)
    }

    fn quote(instrument: &Instrument, price: Decimal, date: NaiveDate) -> Quote {
        Quote {
            symbol: instrument.symbol.clone(),
            market: instrument.market,
            current_price: price,
            open: None,
            high: None,
            low: None,
            previous_close: None,
            date,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn target_alert_then_cooldown() {
        let config = config(&["AAPL"], &[], None);
        let mut h = harness(&config);
        let aapl = Instrument::equity("AAPL");
        h.source.set(quote(&aapl, dec!(95), day(0)));

        let report = h.coordinator.run_batch_at(t0()).await;
        assert_eq!(report, BatchReport { evaluated: 1, alerts_sent: 1, trades: 0, failures: 0 });
        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("BUY TARGET"));

        let report = h.coordinator.run_batch_at(t0() + ChronoDuration::minutes(30)).await;
        assert_eq!(report.alerts_sent, 0);

        let report = h.coordinator.run_batch_at(t0() + ChronoDuration::minutes(61)).await;
        assert_eq!(report.alerts_sent, 1);
    }

    #[tokio::test]
    async fn one_bad_instrument_does_not_stop_the_batch() {
        let config = config(&["MSFT", "AAPL"], &["BTC"], None);
        let mut h = harness(&config);
        let aapl = Instrument::equity("AAPL");
        h.source.set(quote(&aapl, dec!(155), day(0)));
        h.source.set(quote(&Instrument::crypto("BTC"), dec!(0), day(0)));

        let report = h.coordinator.run_batch_at(t0()).await;
        assert_eq!(report.evaluated, 3);
        assert_eq!(report.alerts_sent, 1);
        assert_eq!(report.failures, 2);

        let failures = h.reporter.drain();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].instrument, Some(Instrument::equity("MSFT")));
        assert_eq!(failures[0].stage, Stage::Fetch);
        assert_eq!(failures[1].instrument, Some(Instrument::crypto("BTC")));

        let messages = h.notifier.messages();
        assert!(messages.iter().any(|m| m.contains("SELL TARGET")));
        assert_eq!(messages.iter().filter(|m| m.contains("ERROR")).count(), 2);
    }

    #[tokio::test]
    async fn rsi_alert_respects_cooldown() {
        let config = config(&[], &["ETH"], None);
        let mut h = harness(&config);
        let eth = Instrument::crypto("ETH");
        let price = |n: i64| dec!(2000) - Decimal::from(n * 10);

        h.source.set(quote(&eth, price(0), day(0)));
        assert_eq!(h.coordinator.run_batch_at(t0()).await.alerts_sent, 0);

        h.source.set(quote(&eth, price(1), day(1)));
        assert_eq!(h.coordinator.run_batch_at(t0()).await.alerts_sent, 1);
        assert!(h.notifier.messages()[0].contains("RSI OVERSOLD"));

        for n in 2..14 {
            h.source.set(quote(&eth, price(n), day(n)));
            let report = h.coordinator.run_batch_at(t0() + ChronoDuration::minutes(n)).await;
            assert_eq!(report.alerts_sent, 0);
        }

        assert!(h.coordinator.release(&eth));
        h.source.set(quote(&eth, price(14), day(14)));
        let report = h.coordinator.run_batch_at(t0() + ChronoDuration::minutes(20)).await;
        assert_eq!(report.alerts_sent, 1);

        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].contains("RSI `0.00`"));
        assert!(h.coordinator.is_muted(&eth, t0() + ChronoDuration::minutes(20)));
        assert!(!h.coordinator.monitor().is_ignored(&eth, t0() + ChronoDuration::minutes(20)));

        assert_eq!(h.coordinator.cleanup_at(t0() + ChronoDuration::minutes(90)), 1);
        assert!(!h.coordinator.is_muted(&eth, t0() + ChronoDuration::minutes(90)));
    }

    #[tokio::test]
    async fn indicator_alert_does_not_mute_target_crossing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&["AAPL"], &[], None);
        config.features.paper_trading = true;
        config.simulation.trade_amount = dec!(200);
        config.simulation.portfolio_path = dir.path().join("portfolio.json");
        config.simulation.ledger_path = dir.path().join("transactions.json");

        let mut h = harness(&config);
        let simulator =
            PortfolioSimulator::load(&config.simulation, h.notifier.clone(), h.reporter.clone()).await;
        h.coordinator = h.coordinator.with_simulator(simulator);
        let aapl = Instrument::equity("AAPL");

        h.source.set(quote(&aapl, dec!(130), day(0)));
        assert_eq!(h.coordinator.run_batch_at(t0()).await.alerts_sent, 0);

        h.source.set(quote(&aapl, dec!(120), day(1)));
        let report = h.coordinator.run_batch_at(t0()).await;
        assert_eq!(report.alerts_sent, 1);
        assert_eq!(report.trades, 0);
        assert!(h.notifier.messages()[0].contains("RSI OVERSOLD"));

        h.source.set(quote(&aapl, dec!(95), day(2)));
        let report = h.coordinator.run_batch_at(t0() + ChronoDuration::minutes(10)).await;
        assert_eq!(report, BatchReport { evaluated: 1, alerts_sent: 1, trades: 1, failures: 0 });
        assert!(h.notifier.messages().iter().any(|m| m.contains("BUY TARGET")));
        assert_eq!(h.coordinator.simulator().unwrap().ledger().len(), 1);
    }

    #[tokio::test]
    async fn overflowing_ratio_fails_only_that_instrument() {
        let config = config(&["HUGE", "AAPL"], &[], Some("IDX"));
        let mut h = harness(&config);
        h.source.set(quote(&Instrument::equity("IDX"), dec!(0.0000000001), day(0)));
        h.source.set(quote(&Instrument::equity("HUGE"), dec!(100000000000000000000), day(0)));
        h.source.set(quote(&Instrument::equity("AAPL"), dec!(95), day(0)));

        let report = h.coordinator.run_batch_at(t0()).await;
        assert_eq!(report, BatchReport { evaluated: 2, alerts_sent: 1, trades: 0, failures: 1 });

        let failures = h.reporter.drain();
        assert_eq!(failures[0].instrument, Some(Instrument::equity("HUGE")));
        assert_eq!(failures[0].stage, Stage::Indicators);
        assert!(h.notifier.messages().iter().any(|m| m.contains("BUY TARGET")));
    }

    #[tokio::test]
    async fn target_edits_apply_on_the_next_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equities.json");
        let config = config(&["AAPL"], &[], None);
        let mut h = harness_with(&config, TargetBook::load(&path).unwrap());
        let aapl = Instrument::equity("AAPL");
        h.source.set(quote(&aapl, dec!(120), day(0)));

        assert_eq!(h.coordinator.run_batch_at(t0()).await.alerts_sent, 0);

        TargetBook::load(&path).unwrap().update_target("AAPL", dec!(125), dec!(200)).unwrap();
        let report = h.coordinator.run_batch_at(t0() + ChronoDuration::minutes(1)).await;
        assert_eq!(report.alerts_sent, 1);
        assert!(h.notifier.messages()[0].contains("BUY TARGET"));

        std::fs::write(&path, "[{").unwrap();
        let report = h.coordinator.run_batch_at(t0() + ChronoDuration::minutes(2)).await;
        assert_eq!(report.failures, 1);
        assert_eq!(h.reporter.drain()[0].stage, Stage::Monitor);
        assert_eq!(h.coordinator.monitor().target(&aapl).unwrap().buy_target, dec!(125));
    }

    #[tokio::test]
    async fn disabled_indicator_alerts_stay_quiet() {
        let config = config(&[], &["ETH"], None);
        let mut h = harness(&config);
        let mut features = config.features.clone();
        features.set(Feature::RsiAlerts, false);
        h.coordinator = h.coordinator.with_features(Arc::new(features));
        let eth = Instrument::crypto("ETH");

        for n in 0..20 {
            h.source.set(quote(&eth, dec!(2000) - Decimal::from(n * 10), day(n)));
            h.coordinator.run_batch_at(t0()).await;
        }
        assert!(h.notifier.messages().is_empty());
        assert_eq!(h.coordinator.state().get(&eth).unwrap().rsi.closes().len(), 14);
    }

    #[tokio::test]
    async fn crossover_against_benchmark_is_alerted() {
        let config = config(&["NVDA"], &[], Some("SPY"));
        let mut h = harness(&config);
        let nvda = Instrument::equity("NVDA");
        let spy = Instrument::equity("SPY");
        let mut features = config.features.clone();
        features.set(Feature::RsiAlerts, false);
        h.coordinator = h.coordinator.with_features(Arc::new(features));

        h.source.set(quote(&spy, dec!(500), day(0)));
        for (n, price) in [dec!(100), dec!(90), dec!(80), dec!(120)].into_iter().enumerate() {
            h.source.set(quote(&nvda, price, day(n as i64)));
            let report = h.coordinator.run_batch_at(t0()).await;
            assert_eq!(report.failures, 0);
        }

        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("BULLISH CROSSOVER"));
        assert!(messages[0].contains("RS `"));
    }

    #[tokio::test]
    async fn missing_benchmark_aborts_dependent_instruments() {
        let config = config(&["AAPL"], &["BTC"], Some("SPY"));
        let mut h = harness(&config);
        h.source.set(quote(&Instrument::equity("AAPL"), dec!(95), day(0)));
        h.source.set(quote(&Instrument::crypto("BTC"), dec!(60000), day(0)));

        let report = h.coordinator.run_batch_at(t0()).await;
        assert_eq!(report.failures, 1);
        assert_eq!(report.alerts_sent, 0);

        let failures = h.reporter.drain();
        assert!(failures[0].message.contains("SPY"));
        assert!(h.coordinator.state().get(&Instrument::equity("AAPL")).is_none());
        assert!(h.coordinator.state().get(&Instrument::crypto("BTC")).is_some());
    }

    #[tokio::test]
    async fn paper_trades_follow_threshold_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&["AAPL"], &[], None);
        config.features.paper_trading = true;
        config.simulation.trade_amount = dec!(200);
        config.simulation.portfolio_path = dir.path().join("portfolio.json");
        config.simulation.ledger_path = dir.path().join("transactions.json");

        let mut h = harness(&config);
        let simulator =
            PortfolioSimulator::load(&config.simulation, h.notifier.clone(), h.reporter.clone()).await;
        h.coordinator = h.coordinator.with_simulator(simulator);
        let aapl = Instrument::equity("AAPL");

        h.source.set(quote(&aapl, dec!(100), day(0)));
        let report = h.coordinator.run_batch_at(t0()).await;
        assert_eq!(report.trades, 1);

        h.source.set(quote(&aapl, dec!(150), day(1)));
        let report = h.coordinator.run_batch_at(t0() + ChronoDuration::hours(2)).await;
        assert_eq!(report.trades, 1);

        let simulator = h.coordinator.simulator().unwrap();
        assert_eq!(simulator.portfolio().cash_balance, dec!(100100));
        assert_eq!(simulator.ledger().len(), 2);
        assert!(h.reporter.is_empty());
        assert!(h.notifier.messages().iter().any(|m| m.contains("PAPER SELL")));
    }

    #[tokio::test]
    async fn simulator_errors_become_failure_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&["AAPL"], &[], None);
        config.features.paper_trading = true;
        config.simulation.initial_balance = dec!(50);
        config.simulation.trade_amount = dec!(200);
        config.simulation.portfolio_path = dir.path().join("portfolio.json");
        config.simulation.ledger_path = dir.path().join("transactions.json");

        let mut h = harness(&config);
        let simulator =
            PortfolioSimulator::load(&config.simulation, h.notifier.clone(), h.reporter.clone()).await;
        h.coordinator = h.coordinator.with_simulator(simulator);
        h.source.set(quote(&Instrument::equity("AAPL"), dec!(90), day(0)));

        let report = h.coordinator.run_batch_at(t0()).await;
        assert_eq!(report.alerts_sent, 1);
        assert_eq!(report.trades, 0);
        assert_eq!(report.failures, 1);

        let failures = h.reporter.drain();
        assert_eq!(failures[0].stage, Stage::Simulation);
        assert!(h.notifier.messages().iter().any(|m| m.contains("ERROR")));
    }
}
