use events::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Quote source error: {0}")]
    Source(String),

    #[error("Quote fetch for {symbol} timed out after {secs}s")]
    Timeout { symbol: String, secs: u64 },

    #[error("Invalid quote: {0}")]
    InvalidQuote(#[from] core_types::CoreError),

    #[error("Benchmark {benchmark} has no price for this batch: {reason}")]
    MissingBenchmark { benchmark: String, reason: String },

    #[error("Indicator error: {0}")]
    Indicator(#[from] indicators::IndicatorError),

    #[error("Threshold monitor error: {0}")]
    Monitor(#[from] monitor::MonitorError),

    #[error("Simulation error: {0}")]
    Simulator(#[from] executor::ExecutorError),

    #[error("Serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// The point in the evaluation pipeline this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            EngineError::Source(_)
            | EngineError::Timeout { .. }
            | EngineError::InvalidQuote(_)
            | EngineError::MissingBenchmark { .. }
            | EngineError::SerdeJson(_)
            | EngineError::Io(_) => Stage::Fetch,
            EngineError::Indicator(_) => Stage::Indicators,
            EngineError::Monitor(_) => Stage::Monitor,
            EngineError::Simulator(e) if e.is_persistence() => Stage::Persistence,
            EngineError::Simulator(_) => Stage::Simulation,
        }
    }
}
