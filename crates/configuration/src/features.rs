use serde::Deserialize;

/// Named switches the coordinator consults on every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Feature {
    /// Forward threshold decisions to the paper-trading simulator.
    PaperTrading,
    /// Alert when RSI enters the overbought or oversold zone.
    RsiAlerts,
    /// Alert on relative-strength crossovers against the benchmark.
    RelativeStrengthAlerts,
}

/// Read access to the boolean feature toggles.
pub trait FeatureFlags: Send + Sync {
    fn is_enabled(&self, feature: Feature) -> bool;
}

/// Config-backed toggles, read once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Features {
    pub paper_trading: bool,
    pub rsi_alerts: bool,
    pub relative_strength_alerts: bool,
}

impl Features {
    pub fn set(&mut self, feature: Feature, enabled: bool) {
        match feature {
            Feature::PaperTrading => self.paper_trading = enabled,
            Feature::RsiAlerts => self.rsi_alerts = enabled,
            Feature::RelativeStrengthAlerts => self.relative_strength_alerts = enabled,
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self {
            paper_trading: false,
            rsi_alerts: true,
            relative_strength_alerts: true,
        }
    }
}

impl FeatureFlags for Features {
    fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::PaperTrading => self.paper_trading,
            Feature::RsiAlerts => self.rsi_alerts,
            Feature::RelativeStrengthAlerts => self.relative_strength_alerts,
        }
    }
}
