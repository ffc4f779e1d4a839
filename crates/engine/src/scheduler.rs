use crate::coordinator::SignalCoordinator;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};

/// Counters kept across the scheduler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub batches_started: usize,
    pub ticks_skipped: usize,
}

/// Fixed-rate trigger for evaluation batches and cooldown cleanup.
///
/// A tick that arrives while the previous batch still holds the coordinator is
/// skipped rather than queued.
pub struct Scheduler {
    coordinator: Arc<Mutex<SignalCoordinator>>,
    interval: Duration,
    cleanup_interval: Duration,
}

impl Scheduler {
    pub fn new(coordinator: SignalCoordinator, interval: Duration, cleanup_interval: Duration) -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            interval,
            cleanup_interval,
        }
    }

    pub fn coordinator(&self) -> Arc<Mutex<SignalCoordinator>> {
        Arc::clone(&self.coordinator)
    }

    /// Runs until Ctrl-C, then waits for the batch in flight to finish.
    pub async fn run(&self) -> SchedulerStats {
        let stats = self
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C, running until killed.");
                    std::future::pending::<()>().await;
                }
            })
            .await;

        tracing::info!("Waiting for the current batch to finish...");
        drop(self.coordinator.lock().await);
        stats
    }

    /// Runs until `shutdown` resolves. A batch already in flight keeps running.
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        let mut stats = SchedulerStats::default();
        let mut batch_tick = tokio::time::interval(self.interval);
        batch_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cleanup_tick =
            tokio::time::interval_at(Instant::now() + self.cleanup_interval, self.cleanup_interval);
        cleanup_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            cleanup_secs = self.cleanup_interval.as_secs(),
            "Scheduler started."
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping scheduler.");
                    break;
                }
                _ = batch_tick.tick() => {
                    if self.spawn_batch() {
                        stats.batches_started += 1;
                    } else {
                        stats.ticks_skipped += 1;
                    }
                }
                _ = cleanup_tick.tick() => self.spawn_cleanup(),
            }
        }
        stats
    }

    fn spawn_batch(&self) -> bool {
        match Arc::clone(&self.coordinator).try_lock_owned() {
            Ok(mut coordinator) => {
                tokio::spawn(async move {
                    coordinator.run_batch().await;
                });
                true
            }
            Err(_) => {
                tracing::warn!("Previous batch is still running, skipping this tick.");
                false
            }
        }
    }

    fn spawn_cleanup(&self) {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            let removed = coordinator.lock().await.cleanup();
            tracing::debug!(removed, "Cooldown cleanup finished.");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StaticQuoteSource;
    use alerter::MemoryNotifier;
    use configuration::Config;
    use events::CollectingReporter;
    use monitor::{TargetBook, ThresholdMonitor};

    fn scheduler(interval: Duration) -> Scheduler {
        let mut config = Config::default();
        config.instruments.equities = vec!["AAPL".to_string()];
        config.instruments.equity_benchmark = None;
        let monitor = ThresholdMonitor::new(
            TargetBook::default(),
            TargetBook::default(),
            chrono::Duration::hours(1),
        );
        let coordinator = SignalCoordinator::new(
            &config,
            monitor,
            Arc::new(StaticQuoteSource::new()),
            Arc::new(MemoryNotifier::new()),
            Arc::new(CollectingReporter::new()),
        );
        Scheduler::new(coordinator, interval, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn runs_batches_until_shutdown() {
        let scheduler = scheduler(Duration::from_millis(10));
        let stats = scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(55)))
            .await;
        assert!(stats.batches_started >= 1);
    }

    #[tokio::test]
    async fn skips_ticks_while_a_batch_holds_the_coordinator() {
        let scheduler = scheduler(Duration::from_millis(10));
        let guard = scheduler.coordinator().lock_owned().await;

        let stats = scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(35)))
            .await;
        assert_eq!(stats.batches_started, 0);
        assert!(stats.ticks_skipped >= 1);
        drop(guard);
    }
}
