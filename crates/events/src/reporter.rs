use crate::messages::Failure;
use std::sync::Mutex;

/// The sink for failures that are isolated rather than propagated.
///
/// Implementations must not panic or block for long; they are called from the
/// middle of an evaluation batch.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, failure: Failure);
}

/// Reports failures through `tracing` only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, failure: Failure) {
        tracing::error!(
            stage = %failure.stage,
            instrument = ?failure.instrument.as_ref().map(|i| i.symbol.as_str()),
            "{}",
            failure.message
        );
    }
}

/// Logs each failure and keeps it for later inspection.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    failures: Mutex<Vec<Failure>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything collected so far.
    pub fn drain(&self) -> Vec<Failure> {
        let mut guard = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    pub fn len(&self) -> usize {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, failure: Failure) {
        TracingReporter.report(failure.clone());
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(failure);
    }
}
