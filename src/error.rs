//! Error taxonomy for the market-data ingestion core.
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `std::result::Result<T, CoreError>`. [`CoreError`] covers the six-variant
//! taxonomy of the design: transient network failures, auth failures,
//! protocol decode failures, row-level validation rejections, storage
//! failures, and fatal configuration errors. Only [`CoreError::FatalConfig`]
//! is meant to terminate the process; every other variant is handled locally
//! by the component that produced it.

use std::fmt;

/// All possible errors produced by the ingestion core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Connection reset, read timeout, or a closed WebSocket.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Token refresh or exchange failed.
    #[error("auth failure: {0}")]
    AuthFailure(String),

    /// A raw frame did not match the expected shape.
    #[error("protocol decode error: {0}")]
    ProtocolDecode(String),

    /// A row failed one of the data model's invariants.
    #[error("validation rejected: {0}")]
    ValidationReject(String),

    /// A database or DDL operation failed during a flush.
    #[error("storage error: {0}")]
    Storage(String),

    /// Missing required environment or a corrupt secret; fatal at startup.
    #[error("fatal configuration error: {0}")]
    FatalConfig(String),

    /// The caller provided an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An error response returned by the upstream REST API.
    #[error("API error: {0}")]
    Api(ApiErrorBody),

    /// A network or transport-level error from `reqwest`.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned an unexpected HTTP status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code.
        status: reqwest::StatusCode,
        /// The response body text.
        body: String,
    },

    /// Failed to deserialize a JSON response or frame.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A WebSocket-level error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// A database error from `sqlx`.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CoreError {
    /// Whether this error should be treated as a connection closure for the
    /// purposes of the supervisor's reconnect policy.
    pub fn is_connection_closed(&self) -> bool {
        matches!(
            self,
            CoreError::WebSocket(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
                | CoreError::WebSocket(tokio_tungstenite::tungstenite::Error::AlreadyClosed)
        )
    }
}

/// Structured error body, mirrored from upstream REST error responses.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorBody {
    /// Upstream error code, if present.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Human-readable description of the error.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.error_code.as_deref().unwrap_or("UNKNOWN"),
            self.error_message.as_deref().unwrap_or("no message"),
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
