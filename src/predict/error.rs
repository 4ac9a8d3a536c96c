use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Invalid element set {name}: {message}")]
    InvalidElementSet { name: String, message: String },
    #[error("Invalid observer {name}: {message}")]
    InvalidObserver { name: String, message: String },
    #[error("Propagation error for {observer} at {at}: {message}")]
    Propagation {
        observer: String,
        at: DateTime<Utc>,
        message: String,
    },
    #[error("Invalid search settings: {0}")]
    InvalidSettings(String),
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
}

impl PredictError {
    pub fn invalid_elements(name: impl Into<String>, message: impl ToString) -> Self {
        PredictError::InvalidElementSet {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_observer(name: impl Into<String>, message: impl ToString) -> Self {
        PredictError::InvalidObserver {
            name: name.into(),
            message: message.to_string(),
        }
    }
}
