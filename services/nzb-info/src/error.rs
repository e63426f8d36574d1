//! Error types for the nzb-info service

/// Errors that can occur in the nzb-info service
#[derive(Debug, thiserror::Error)]
pub enum NzbInfoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for nzb-info operations
pub type Result<T> = std::result::Result<T, NzbInfoError>;
