/*
[INPUT]:  Error sources (HTTP, API, serialization, auth, WebSocket)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the CoinEx adapter
#[derive(Error, Debug)]
pub enum CoinexError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// Server rejected the `server.sign` request
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A private channel was requested before authentication succeeded
    #[error("Connection is not authenticated")]
    NotAuthenticated,

    /// No open WebSocket connection
    #[error("WebSocket not connected")]
    NotConnected,

    /// `connect` called on a client that already holds a connection
    #[error("WebSocket already connected")]
    AlreadyConnected,

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Inbound frame could not be turned into text
    #[error("Frame decode error: {0}")]
    Decode(String),

    /// Timed out waiting for a server response
    #[error("Timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoinexError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoinexError::Http(_)
                | CoinexError::Timeout { .. }
                | CoinexError::WebSocket(_)
                | CoinexError::NotConnected
        )
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            CoinexError::Authentication { .. } | CoinexError::NotAuthenticated
        )
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        CoinexError::Api {
            code: i64::from(status.as_u16()),
            message: message.into(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CoinexError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        CoinexError::WebSocket(err.to_string())
    }
}

/// Result type alias for CoinEx operations
pub type Result<T> = std::result::Result<T, CoinexError>;
