use alerter::{LogNotifier, MemoryNotifier, Notifier, notifier_from_config};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{Config, Feature, FeatureFlags, load_config};
use core_types::{Instrument, MarketType};
use engine::{Scheduler, SignalCoordinator, SnapshotQuoteSource};
use events::{CollectingReporter, ErrorReporter, TracingReporter};
use executor::{JsonStore, PortfolioSimulator, read_ledger};
use monitor::{TargetBook, ThresholdMonitor};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// The main entry point for the Pricewatch signal engine.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets such as the Telegram token may live in a .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let _guard = init_logging(&config)?;

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            handle_run(config).await?;
        }
        Commands::Tick(args) => {
            args.features.apply(&mut config);
            handle_tick(config, args.dry_run).await?;
        }
        Commands::Portfolio => handle_portfolio(&config).await?,
        Commands::Ledger(args) => handle_ledger(&config, args.limit).await?,
        Commands::Target(command) => handle_target(&config, command)?,
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Price alerts, technical signals and paper trading for equities and crypto.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate all instruments on a fixed interval until Ctrl-C.
    Run(FeatureArgs),
    /// Evaluate all instruments once and exit.
    Tick(TickArgs),
    /// Show the paper-trading portfolio.
    Portfolio,
    /// Show the simulated transaction history.
    Ledger(LedgerArgs),
    /// Inspect or edit target prices.
    #[command(subcommand)]
    Target(TargetCommand),
}

#[derive(Parser)]
struct FeatureArgs {
    /// Enable a feature for this process regardless of the configuration.
    #[arg(long = "enable", value_enum)]
    enable: Vec<Feature>,
}

impl FeatureArgs {
    fn apply(&self, config: &mut Config) {
        for feature in &self.enable {
            config.features.set(*feature, true);
        }
    }
}

#[derive(Parser)]
struct TickArgs {
    /// Print alerts instead of sending them, and skip paper trading.
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    features: FeatureArgs,
}

#[derive(Parser)]
struct LedgerArgs {
    /// Only show the most recent N transactions.
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Subcommand)]
enum TargetCommand {
    /// List a market's target prices.
    List {
        #[arg(long, value_enum, default_value_t = MarketArg::Equity)]
        market: MarketArg,
    },
    /// Create or update the buy/sell targets for a symbol.
    Set {
        symbol: String,
        #[arg(long)]
        buy: Decimal,
        #[arg(long)]
        sell: Decimal,
        #[arg(long, value_enum, default_value_t = MarketArg::Equity)]
        market: MarketArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MarketArg {
    Equity,
    Crypto,
}

impl From<MarketArg> for MarketType {
    fn from(market: MarketArg) -> Self {
        match market {
            MarketArg::Equity => MarketType::Equity,
            MarketArg::Crypto => MarketType::Crypto,
        }
    }
}

// ==============================================================================
// Bootstrap
// ==============================================================================

/// Logs to stdout and to a daily-rolling file. The guard must outlive `main`'s work.
fn init_logging(config: &Config) -> anyhow::Result<WorkerGuard> {
    let appender =
        tracing_appender::rolling::daily(&config.logging.directory, &config.logging.file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;
    Ok(guard)
}

async fn build_coordinator(
    config: &Config,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn ErrorReporter>,
    paper_trading: bool,
) -> anyhow::Result<SignalCoordinator> {
    let cooldown = chrono::Duration::from_std(config.monitor.cooldown())
        .context("monitor.cooldown_secs is out of range")?;
    let monitor = ThresholdMonitor::new(
        TargetBook::load(&config.monitor.equity_targets_path)?,
        TargetBook::load(&config.monitor.crypto_targets_path)?,
        cooldown,
    );
    let source = Arc::new(SnapshotQuoteSource::new(&config.sources.quotes_path));

    let mut coordinator =
        SignalCoordinator::new(config, monitor, source, notifier.clone(), reporter.clone());
    if paper_trading {
        let simulator = PortfolioSimulator::load(&config.simulation, notifier, reporter).await;
        coordinator = coordinator.with_simulator(simulator);
    }
    tracing::info!(
        instruments = coordinator.instruments().len(),
        paper_trading,
        "Signal coordinator ready."
    );
    Ok(coordinator)
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn handle_run(config: Config) -> anyhow::Result<()> {
    if config.instruments.tracked().is_empty() {
        tracing::warn!("No instruments configured. Exiting.");
        return Ok(());
    }

    let notifier = notifier_from_config(&config.telegram);
    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);
    let paper_trading = config.features.is_enabled(Feature::PaperTrading);
    let coordinator = build_coordinator(&config, notifier, reporter, paper_trading).await?;

    let scheduler = Scheduler::new(
        coordinator,
        config.schedule.interval(),
        config.schedule.cleanup_interval(),
    );
    let stats = scheduler.run().await;
    tracing::info!(
        batches = stats.batches_started,
        skipped = stats.ticks_skipped,
        "Scheduler stopped."
    );
    Ok(())
}

async fn handle_tick(config: Config, dry_run: bool) -> anyhow::Result<()> {
    let memory = Arc::new(MemoryNotifier::new());
    let notifier: Arc<dyn Notifier> = if dry_run {
        memory.clone()
    } else {
        notifier_from_config(&config.telegram)
    };
    let reporter = Arc::new(CollectingReporter::new());
    let paper_trading = !dry_run && config.features.is_enabled(Feature::PaperTrading);

    let mut coordinator = build_coordinator(&config, notifier, reporter.clone(), paper_trading).await?;
    let report = coordinator.run_batch().await;

    for message in memory.messages() {
        println!("{message}\n");
    }
    println!(
        "Evaluated {} instruments: {} alerts, {} trades, {} failures.",
        report.evaluated, report.alerts_sent, report.trades, report.failures
    );
    for failure in reporter.drain() {
        println!("  {failure}");
    }
    Ok(())
}

async fn handle_portfolio(config: &Config) -> anyhow::Result<()> {
    let simulator = PortfolioSimulator::load(
        &config.simulation,
        Arc::new(LogNotifier),
        Arc::new(TracingReporter),
    )
    .await;
    let summary = simulator.summary();

    let mut positions = Table::new();
    positions
        .load_preset(UTF8_FULL)
        .set_header(vec!["Symbol", "Market", "Quantity", "Avg Price", "Cost Basis", "Opened"]);
    for position in &summary.positions {
        positions.add_row(vec![
            position.symbol.clone(),
            position.market.to_string(),
            position.quantity.round_dp(6).to_string(),
            position.average_price.to_string(),
            position.cost_basis().round_dp(2).to_string(),
            position.opened_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    let mut totals = Table::new();
    totals.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    totals.add_row(vec!["Cash".to_string(), summary.cash_balance.round_dp(2).to_string()]);
    totals.add_row(vec!["Invested".to_string(), summary.invested.round_dp(2).to_string()]);
    totals.add_row(vec!["Realised P/L".to_string(), summary.realized_pnl.round_dp(2).to_string()]);
    totals.add_row(vec!["Trades".to_string(), summary.trades.to_string()]);

    // Mark to market when the latest snapshot prices every open position.
    match SnapshotQuoteSource::new(&config.sources.quotes_path).load_all().await {
        Ok(quotes) => {
            let prices: HashMap<Instrument, Decimal> = quotes
                .into_iter()
                .map(|quote| (quote.instrument(), quote.current_price))
                .collect();
            match simulator.portfolio().total_equity(&prices) {
                Ok(equity) => {
                    totals.add_row(vec!["Equity".to_string(), equity.round_dp(2).to_string()]);
                }
                Err(e) => tracing::debug!(error = %e, "Skipping equity, snapshot is incomplete."),
            }
        }
        Err(e) => tracing::debug!(error = %e, "Skipping equity, no quote snapshot."),
    }

    println!("{positions}");
    println!("{totals}");
    Ok(())
}

async fn handle_ledger(config: &Config, limit: Option<usize>) -> anyhow::Result<()> {
    // An unreadable ledger is logged and shown as empty, as the simulator treats it.
    let (ledger, _) = read_ledger(&JsonStore::new(&config.simulation.ledger_path)).await;
    let skip = limit.map_or(0, |n| ledger.len().saturating_sub(n));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Time", "Side", "Symbol", "Market", "Quantity", "Price", "Notional", "Reason"]);
    for tx in ledger.iter().skip(skip) {
        table.add_row(vec![
            tx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            tx.side.to_string(),
            tx.symbol.clone(),
            tx.market.to_string(),
            tx.quantity.round_dp(6).to_string(),
            tx.price.to_string(),
            tx.notional().round_dp(2).to_string(),
            tx.reason.clone(),
        ]);
    }
    println!("{table}");
    println!("{} transactions.", ledger.len());
    Ok(())
}

fn handle_target(config: &Config, command: TargetCommand) -> anyhow::Result<()> {
    match command {
        TargetCommand::List { market } => {
            let book = TargetBook::load(config.monitor.targets_path(market.into()))?;
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["Symbol", "Buy", "Sell"]);
            for target in book.iter() {
                table.add_row(vec![
                    target.symbol.clone(),
                    target.buy_target.to_string(),
                    target.sell_target.to_string(),
                ]);
            }
            println!("{table}");
        }
        TargetCommand::Set { symbol, buy, sell, market } => {
            let instrument = Instrument::new(&symbol, market.into());
            let path = config.monitor.targets_path(instrument.market);
            let mut book = TargetBook::load(path)?;
            book.update_target(&instrument.symbol, buy, sell)?;
            println!(
                "{}: buy at or below {}, sell at or above {} ({}).",
                instrument,
                buy,
                sell,
                path.display()
            );
        }
    }
    Ok(())
}
