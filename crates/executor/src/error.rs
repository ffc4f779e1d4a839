use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Invalid trade input: {0}")]
    InvalidInput(String),

    #[error("Not enough cash available to execute trade. Required: {required}, Available: {available}")]
    InsufficientCash { required: String, available: String },

    #[error("A position in {0} is already open")]
    PositionAlreadyOpen(String),

    #[error("Failed to access portfolio document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Portfolio document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExecutorError {
    /// Whether this error came from reading or writing a document.
    pub fn is_persistence(&self) -> bool {
        matches!(self, ExecutorError::Io(_) | ExecutorError::Json(_))
    }
}
