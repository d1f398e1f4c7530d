//! Error types for HTTP delivery.

use thiserror::Error;

/// Error type for a single HTTP exchange.
///
/// Describes what went wrong at the transport level; whether it is worth
/// retrying is decided by [`RetryPolicy`](super::RetryPolicy).
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed (DNS, refused, reset, ...).
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server did not respond within the per-request timeout.
    #[error("Request timed out")]
    Timeout,

    /// The request URL was rejected by the client.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// The `timeout` option of a destination URI could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid timeout '{value}': {reason}")]
pub struct InvalidTimeout {
    /// The raw option value
    pub value: String,
    /// Why it was rejected
    pub reason: String,
}

/// Failure of one delivery attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Transport-level failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The server answered with a non-2xx status.
    #[error("Chat API responded with status {status}: {}", .body.as_deref().unwrap_or("<non-utf8 body>"))]
    NonSuccessStatus {
        /// Response status
        status: http::StatusCode,
        /// Response body, when it is valid UTF-8
        body: Option<String>,
    },
}

impl AttemptError {
    /// Returns the HTTP status if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::NonSuccessStatus { status, .. } => Some(*status),
            Self::Http(_) => None,
        }
    }
}

/// Error returned when a message could not be delivered.
///
/// Produced after the retry policy has been applied; the worker logs it and
/// moves on to the next queued message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The message could not be serialized into a request payload.
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The attempt failed in a way that retrying cannot fix
    /// (fatal status or invalid URL).
    #[error("Delivery rejected: {0}")]
    Rejected(#[source] AttemptError),

    /// Every allowed attempt failed with a transient error.
    #[error("Delivery failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        #[source]
        last_error: AttemptError,
    },
}

impl DeliveryError {
    /// Returns the HTTP status of the final response, if one was received.
    #[must_use]
    pub const fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::Rejected(e) | Self::RetriesExhausted { last_error: e, .. } => e.status(),
            Self::Serialize(_) => None,
        }
    }
}
