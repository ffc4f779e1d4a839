use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Indicator received invalid input: {0}")]
    InvalidInput(String),

    #[error("Indicator received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("An error occurred during indicator calculation: {0}")]
    Calculation(String),
}

impl From<CoreError> for IndicatorError {
    fn from(err: CoreError) -> Self {
        IndicatorError::InvalidInput(err.to_string())
    }
}
