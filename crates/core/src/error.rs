use thiserror::Error;

#[derive(Debug, Error)]
pub enum StockcastError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Upstream data unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Insufficient history: window size {window} exceeds {available} available values")]
    InsufficientHistory { window: usize, available: usize },
    #[error("Data error: {0}")]
    DataError(String),
    #[error("Model error: {0}")]
    ModelError(String),
    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, StockcastError>;

impl From<std::io::Error> for StockcastError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StockcastError::ArtifactNotFound(err.to_string())
        } else {
            StockcastError::Io(err.to_string())
        }
    }
}

impl From<reqwest::Error> for StockcastError {
    fn from(err: reqwest::Error) -> Self {
        StockcastError::UpstreamUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StockcastError {
    fn from(err: serde_json::Error) -> Self {
        StockcastError::DataError(err.to_string())
    }
}

impl From<csv::Error> for StockcastError {
    fn from(err: csv::Error) -> Self {
        StockcastError::DataError(err.to_string())
    }
}
