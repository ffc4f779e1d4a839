use crate::error::EngineError;
use async_trait::async_trait;
use core_types::{Instrument, Quote};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Supplies the latest quote for an instrument.
///
/// Implementations own their transport; the coordinator bounds every call
/// with its own timeout.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, instrument: &Instrument) -> Result<Quote, EngineError>;
}

/// Reads quotes from a JSON array document that an external poller keeps fresh.
///
/// The file is re-read on every fetch so updates are picked up without a restart.
#[derive(Debug, Clone)]
pub struct SnapshotQuoteSource {
    path: PathBuf,
}

impl SnapshotQuoteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load_all(&self) -> Result<Vec<Quote>, EngineError> {
        let data = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[async_trait]
impl QuoteSource for SnapshotQuoteSource {
    async fn fetch_quote(&self, instrument: &Instrument) -> Result<Quote, EngineError> {
        self.load_all()
            .await?
            .into_iter()
            .find(|quote| quote.instrument() == *instrument)
            .ok_or_else(|| {
                EngineError::Source(format!(
                    "no quote for {} in {}",
                    instrument,
                    self.path.display()
                ))
            })
    }
}

/// Serves whatever quotes were last handed to it.
#[derive(Debug, Default)]
pub struct StaticQuoteSource {
    quotes: Mutex<HashMap<Instrument, Quote>>,
}

impl StaticQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, quote: Quote) {
        self.quotes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(quote.instrument(), quote);
    }
}

#[async_trait]
impl QuoteSource for StaticQuoteSource {
    async fn fetch_quote(&self, instrument: &Instrument) -> Result<Quote, EngineError> {
        self.quotes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(instrument)
            .cloned()
            .ok_or_else(|| EngineError::Source(format!("no quote for {instrument}")))
    }
}
