use chrono::{DateTime, Duration, Utc};
use core_types::Instrument;
use std::collections::HashMap;

/// Instruments muted after a signal fired, with the time they were muted.
///
/// An entry suppresses alerts until it is at least `cooldown` old. Expired
/// entries stop suppressing immediately but are only removed by `cleanup`
/// or `release`.
#[derive(Debug, Clone)]
pub struct IgnoreList {
    entries: HashMap<Instrument, DateTime<Utc>>,
    cooldown: Duration,
}

impl IgnoreList {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            cooldown,
        }
    }

    /// Starts (or restarts) the cooldown for `instrument` at `at`.
    pub fn ignore(&mut self, instrument: &Instrument, at: DateTime<Utc>) {
        self.entries.insert(instrument.clone(), at);
    }

    pub fn is_ignored(&self, instrument: &Instrument, now: DateTime<Utc>) -> bool {
        self.entries
            .get(instrument)
            .is_some_and(|&at| now - at < self.cooldown)
    }

    /// Drops the entry for `instrument`, returning whether one existed.
    pub fn release(&mut self, instrument: &Instrument) -> bool {
        self.entries.remove(instrument).is_some()
    }

    /// Removes every entry whose cooldown has elapsed and returns them.
    pub fn cleanup(&mut self, now: DateTime<Utc>) -> Vec<Instrument> {
        let expired: Vec<Instrument> = self
            .entries
            .iter()
            .filter(|&(_, &at)| now - at >= self.cooldown)
            .map(|(instrument, _)| instrument.clone())
            .collect();
        for instrument in &expired {
            self.entries.remove(instrument);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}
