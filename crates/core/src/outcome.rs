//! The terminal result of one relay exchange.
//!
//! Exactly one `RelayOutcome` is produced per exchange: either the content
//! fragments were forwarded (success) or a single terminal error payload is
//! returned — never both.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// The terminal error payload shown to the caller.
///
/// `content` is `"<category>: <message>"`; `citations` is always empty on
/// the failure path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub content: String,

    #[serde(default)]
    pub citations: Vec<serde_json::Value>,
}

impl ErrorPayload {
    pub fn new(category: &str, message: impl AsRef<str>) -> Self {
        Self {
            content: format!("{}: {}", category, message.as_ref()),
            citations: Vec::new(),
        }
    }
}

impl From<&RelayError> for ErrorPayload {
    fn from(err: &RelayError) -> Self {
        Self::new(err.category(), err.to_string())
    }
}

/// How one exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Interactive mode: all content fragments were forwarded to the output sink.
    Streamed {
        /// Number of content chunks forwarded.
        chunks: usize,
    },

    /// Task mode: the complete (possibly empty) response text.
    Task(String),

    /// The exchange failed with a terminal payload.
    Error(ErrorPayload),
}

impl RelayOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
