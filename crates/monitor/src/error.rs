use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to access target list: {0}")]
    Io(#[from] std::io::Error),

    #[error("Target list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid target entry: {0}")]
    InvalidTarget(String),
}
