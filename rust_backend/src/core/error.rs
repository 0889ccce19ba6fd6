//! Error types for dropout analysis.

/// Result type for dropout analysis operations
pub type LosResult<T> = Result<T, LosError>;

/// Error type for dropout analysis operations
#[derive(Debug, thiserror::Error)]
pub enum LosError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] polars::prelude::PolarsError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LosError {
    /// Whether the error comes from caller-supplied settings rather than data.
    pub fn is_configuration(&self) -> bool {
        matches!(self, LosError::Configuration(_) | LosError::Toml(_))
    }
}
