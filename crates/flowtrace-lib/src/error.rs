use thiserror::Error;

/// Errors that can occur when loading executions or exporting traces
#[derive(Debug, Error)]
pub enum TraceError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid trace data
    #[error("Invalid trace data: {0}")]
    InvalidData(String),

    /// Unsupported file format
    #[error("Unsupported trace format: {0}")]
    UnsupportedFormat(String),
}

impl TraceError {
    /// Create a new invalid data error
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }
}

/// Result type for trace operations
pub type TraceResult<T> = Result<T, TraceError>;
