//! Unified error types for the Concord core.
//!
//! Framework-level errors (like `DispatchError`) are defined in
//! `concord-framework`; configuration errors live in `concord-runtime`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by the gateway connection.
///
/// A transport error while connecting is the only failure that is fatal to a
/// running client; everything else is contained where it happens.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The endpoint that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Message send failed.
    #[error("failed to send: {0}")]
    SendFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for calls made through a [`RestClient`](crate::RestClient).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The requested entity does not exist or is not visible.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Entity kind ("guild", "channel", ...).
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },
    /// The collaborator does not implement this call.
    #[error("operation not supported by this client")]
    NotSupported,
    /// The client is not connected.
    #[error("client is not connected")]
    NotConnected,
    /// The call timed out.
    #[error("API call timed out")]
    Timeout,
    /// The remote API rejected the call (rate limit, permissions, ...).
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns `true` if this error means the entity is absent remotely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
