//! Error types for the inlet domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own error enum; the orchestrator maps them onto the three
//! caller-facing categories (`ValidationError`, `TransportError`,
//! `UnexpectedError`). Malformed control-message JSON is deliberately
//! absent here — the demultiplexer reclassifies it as content and it never
//! becomes an error.

use thiserror::Error;

/// The top-level error type for all inlet operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum RelayError {
    // Display is the user-facing localized message, no prefix.
    #[error("{0}")]
    Validation(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl RelayError {
    /// The caller-facing error category for the terminal payload.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::ApiError { .. }
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::StreamInterrupted(_) => "TransportError",
            Self::InvalidPayload(_) => "UnexpectedError",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
