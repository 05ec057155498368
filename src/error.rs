use thiserror::Error;

/// Failure talking to the question-answering backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },
    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid file '{path}': {reason}")]
    InvalidFile { path: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// A single stream record that could not be interpreted.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record has no string `type` field")]
    MissingType,
}

/// Bytes in the answer stream that did not decode cleanly as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeAnomaly {
    #[error("replaced {bytes} invalid UTF-8 byte(s)")]
    InvalidSequence { bytes: usize },
    #[error("dropped {bytes} byte(s) of an incomplete character at end of stream")]
    TruncatedTail { bytes: usize },
}
