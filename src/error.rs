use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrelationError {
    #[error("Input vector was empty")]
    EmptyInput,

    #[error("Invalid vector size {len}: {reason}")]
    InvalidSize { len: usize, reason: String },

    #[error("Vector sizes differ: {left} vs {right}")]
    SizeMismatch { left: usize, right: usize },

    #[error("Accelerator fault: {0}")]
    AcceleratorFault(String),

    #[error("Search finished without an improving candidate")]
    DegenerateResult,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CorrelationError {
    pub fn invalid_size(len: usize, reason: impl Into<String>) -> Self {
        Self::InvalidSize {
            len,
            reason: reason.into(),
        }
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::AcceleratorFault(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CorrelationError>;
