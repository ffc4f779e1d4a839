use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod features;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use features::{Feature, FeatureFlags, Features};
pub use settings::{
    Config, Indicators, Instruments, Logging, Monitor, Schedule, Simulation, Sources,
    TelegramConfig,
};

/// Loads the application configuration from a TOML file and `APP_*` environment variables.
///
/// The file is optional; environment variables use `__` to address nested keys
/// (e.g. `APP_TELEGRAM__TOKEN`). The result is validated before it is returned.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("instruments.equities")
                .with_list_parse_key("instruments.crypto"),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(
        equities = config.instruments.equities.len(),
        crypto = config.instruments.crypto.len(),
        "Configuration loaded."
    );
    Ok(config)
}
