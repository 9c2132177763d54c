//! Error types for the TIE client.

use thiserror::Error;

/// Result type for TIE client operations.
pub type Result<T> = std::result::Result<T, TieError>;

/// TIE client errors.
#[derive(Debug, Error)]
pub enum TieError {
    /// Configuration error (missing token, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport error (connection refused, TLS, timeout). Never retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server error (status >= 500) after retries were exhausted
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Client error (non-success status below 500). Never retried.
    #[error("API error ({status}): {message}")]
    Client { status: u16, message: String },

    /// Decode error (malformed JSON, Link header or filter payload)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Unknown output format name
    #[error("Unsupported output format requested: {0}")]
    UnsupportedFormat(String),

    /// Output format that is accepted but has no encoder
    #[error("Output format not implemented: {0}")]
    Unimplemented(&'static str),

    /// Filter construction or encoding failed
    #[error("Filter error: {0}")]
    Filter(#[from] bloom_filter::BloomError),

    /// Writing to the destination failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TieError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TieError::Server { status, .. } | TieError::Client { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TieError {
    fn from(e: serde_json::Error) -> Self {
        TieError::Decode(e.to_string())
    }
}
