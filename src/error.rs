use std::path::PathBuf;

use thiserror::Error;

/// Main error type for option pricing experiments
#[derive(Error, Debug)]
pub enum OptrlError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // Model parameter errors
    #[error("Numeric domain error: {0}")]
    NumericDomain(String),

    // Training contract errors
    #[error("Insufficient data: requested {requested} transitions, {available} available")]
    InsufficientData { requested: usize, available: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Policy artifacts
    #[error("Policy artifact not found: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Model record error: {0}")]
    Recorder(String),

    // Tensor backend errors
    #[error("Tensor error: {0}")]
    Tensor(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for OptrlError
pub type Result<T> = std::result::Result<T, OptrlError>;

impl OptrlError {
    pub(crate) fn missing_artifact<P: Into<PathBuf>>(path: P) -> Self {
        OptrlError::MissingArtifact { path: path.into() }
    }
}
