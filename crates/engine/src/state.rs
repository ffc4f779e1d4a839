use crate::error::EngineError;
use configuration::Indicators;
use core_types::Instrument;
use indicators::{RelativeStrengthEngine, RsiEngine, RsiThresholds};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// The indicator engines that belong to a single instrument.
#[derive(Debug, Clone)]
pub struct InstrumentState {
    pub rsi: RsiEngine,
    pub relative_strength: RelativeStrengthEngine,
}

impl InstrumentState {
    pub fn new(settings: &Indicators) -> Result<Self, EngineError> {
        let thresholds = RsiThresholds {
            overbought: settings.rsi_overbought,
            oversold: settings.rsi_oversold,
        };
        Ok(Self {
            rsi: RsiEngine::new(settings.rsi_period, thresholds)?,
            relative_strength: RelativeStrengthEngine::new(
                settings.relative_strength_window,
                settings.relative_strength_ema_period,
            )?,
        })
    }
}

/// Owns every instrument's indicator state for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct StateContainer {
    settings: Indicators,
    instruments: HashMap<Instrument, InstrumentState>,
}

impl StateContainer {
    pub fn new(settings: Indicators) -> Self {
        Self {
            settings,
            instruments: HashMap::new(),
        }
    }

    /// Returns the state for `instrument`, creating empty engines on first use.
    pub fn entry(&mut self, instrument: &Instrument) -> Result<&mut InstrumentState, EngineError> {
        match self.instruments.entry(instrument.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(InstrumentState::new(&self.settings)?)),
        }
    }

    pub fn get(&self, instrument: &Instrument) -> Option<&InstrumentState> {
        self.instruments.get(instrument)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn state_is_created_once_per_instrument() {
        let mut states = StateContainer::new(Indicators::default());
        let aapl = Instrument::equity("AAPL");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        states.entry(&aapl).unwrap().rsi.add_close(date, dec!(10)).unwrap();
        states.entry(&aapl).unwrap();
        states.entry(&Instrument::crypto("AAPL")).unwrap();

        assert_eq!(states.len(), 2);
        assert_eq!(states.get(&aapl).unwrap().rsi.closes().len(), 1);
    }

    #[test]
    fn invalid_settings_surface_on_first_use() {
        let settings = Indicators {
            rsi_period: 1,
            ..Indicators::default()
        };
        let mut states = StateContainer::new(settings);
        assert!(states.entry(&Instrument::equity("AAPL")).is_err());
        assert!(states.is_empty());
    }
}
