use crate::error::ConfigError;
use crate::features::Features;
use core_types::{Instrument, MarketType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its defaults, so a missing `config.toml`
/// still yields a runnable (if empty) watch list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: Schedule,
    pub instruments: Instruments,
    pub indicators: Indicators,
    pub monitor: Monitor,
    pub simulation: Simulation,
    pub features: Features,
    pub telegram: TelegramConfig,
    pub sources: Sources,
    pub logging: Logging,
}

impl Config {
    /// Checks the cross-field constraints that `serde` cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.interval_secs == 0 || self.schedule.cleanup_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "schedule intervals must be greater than zero".to_string(),
            ));
        }
        self.indicators.validate()?;
        if self.monitor.cooldown_secs == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.cooldown_secs must be greater than zero".to_string(),
            ));
        }
        if self.simulation.trade_amount <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "simulation.trade_amount must be greater than zero".to_string(),
            ));
        }
        if self.simulation.initial_balance < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "simulation.initial_balance cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Timing of the periodic evaluation batch and of the cooldown sweep.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub interval_secs: u64,
    pub cleanup_interval_secs: u64,
    /// Upper bound for a single quote fetch before the instrument is skipped.
    pub fetch_timeout_secs: u64,
}

impl Schedule {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            cleanup_interval_secs: 300,
            fetch_timeout_secs: 10,
        }
    }
}

/// The watch list, one symbol list per market plus optional benchmarks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Instruments {
    pub equities: Vec<String>,
    pub crypto: Vec<String>,
    /// Index used for equity relative-strength comparisons (e.g. "SPY").
    pub equity_benchmark: Option<String>,
    pub crypto_benchmark: Option<String>,
}

impl Instruments {
    /// All tracked instruments, equities first, in configuration order.
    pub fn tracked(&self) -> Vec<Instrument> {
        self.equities
            .iter()
            .map(Instrument::equity)
            .chain(self.crypto.iter().map(Instrument::crypto))
            .collect()
    }

    pub fn benchmark(&self, market: MarketType) -> Option<Instrument> {
        let symbol = match market {
            MarketType::Equity => self.equity_benchmark.as_ref(),
            MarketType::Crypto => self.crypto_benchmark.as_ref(),
        }?;
        Some(Instrument::new(symbol, market))
    }
}

impl Default for Instruments {
    fn default() -> Self {
        Self {
            equities: Vec::new(),
            crypto: Vec::new(),
            equity_benchmark: Some("SPY".to_string()),
            crypto_benchmark: None,
        }
    }
}

/// Parameters for the RSI and relative-strength indicators.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Indicators {
    pub rsi_period: usize,
    pub rsi_overbought: Decimal,
    pub rsi_oversold: Decimal,
    /// Maximum retained ratio observations per instrument.
    pub relative_strength_window: usize,
    pub relative_strength_ema_period: usize,
}

impl Indicators {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.rsi_period == 0 || self.relative_strength_ema_period == 0 {
            return Err(ConfigError::ValidationError(
                "Indicator periods cannot be zero".to_string(),
            ));
        }
        if self.rsi_period < 2 {
            return Err(ConfigError::ValidationError(
                "indicators.rsi_period must cover at least two closes".to_string(),
            ));
        }
        if self.relative_strength_window < 2 {
            return Err(ConfigError::ValidationError(
                "indicators.relative_strength_window must hold at least two points".to_string(),
            ));
        }
        let in_range = |v: Decimal| v >= Decimal::ZERO && v <= Decimal::ONE_HUNDRED;
        if !in_range(self.rsi_oversold) || !in_range(self.rsi_overbought) {
            return Err(ConfigError::ValidationError(
                "RSI thresholds must lie within [0, 100]".to_string(),
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(ConfigError::ValidationError(
                "indicators.rsi_oversold must be below indicators.rsi_overbought".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Indicators {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_overbought: dec!(70),
            rsi_oversold: dec!(30),
            relative_strength_window: 200,
            relative_strength_ema_period: 20,
        }
    }
}

/// Settings for the target-price monitor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Monitor {
    /// How long a symbol stays muted after a signal fires.
    pub cooldown_secs: u64,
    pub equity_targets_path: PathBuf,
    pub crypto_targets_path: PathBuf,
}

impl Monitor {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn targets_path(&self, market: MarketType) -> &PathBuf {
        match market {
            MarketType::Equity => &self.equity_targets_path,
            MarketType::Crypto => &self.crypto_targets_path,
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            cooldown_secs: 3600,
            equity_targets_path: PathBuf::from("data/equity_targets.json"),
            crypto_targets_path: PathBuf::from("data/crypto_targets.json"),
        }
    }
}

/// Contains parameters for the paper-trading simulator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// Cash the virtual portfolio starts with when no state has been persisted.
    pub initial_balance: Decimal,
    /// The fixed dollar amount spent on every simulated buy.
    pub trade_amount: Decimal,
    pub portfolio_path: PathBuf,
    pub ledger_path: PathBuf,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            initial_balance: dec!(100000),
            trade_amount: dec!(1000),
            portfolio_path: PathBuf::from("data/portfolio.json"),
            ledger_path: PathBuf::from("data/transactions.json"),
        }
    }
}

/// Credentials for the Telegram alert channel. Empty values disable delivery.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

/// Where the file-backed quote source reads its snapshot from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub quotes_path: PathBuf,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            quotes_path: PathBuf::from("data/quotes.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub directory: PathBuf,
    pub file_prefix: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_prefix: "pricewatch.log".to_string(),
        }
    }
}
