//! Error types for destination construction, submission and lifecycle.

use thiserror::Error;

use crate::provider::InvalidTimeout;

/// Error building a destination from its URI.
///
/// All variants are fatal at startup: the relay never runs with a partially
/// built destination set.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No constructor is registered for the URI scheme.
    #[error("Unknown destination type '{scheme}'")]
    UnknownDestinationType {
        /// The unregistered scheme
        scheme: String,
    },

    /// The URI is malformed or lacks a required part.
    ///
    /// `uri` has its credential masked.
    #[error("Invalid destination URI '{uri}': {reason}")]
    InvalidUri {
        /// The offending URI, redacted
        uri: String,
        /// Reason for invalidity
        reason: String,
    },

    /// The `timeout` query option is not a positive integer.
    #[error(transparent)]
    InvalidTimeout(#[from] InvalidTimeout),

    /// The HTTP client backing the destination could not be created.
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Error submitting a message to a destination.
///
/// Submission only reports whether the message was queued; delivery
/// failures are never returned here.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The message does not match the destination's schema.
    #[error("Invalid message type: expected {expected} message: {reason}")]
    InvalidMessageType {
        /// Message shape the destination accepts
        expected: &'static str,
        /// What did not match
        reason: String,
    },

    /// The bounded queue has no free slot.
    #[error("The queue of destination '{destination}' is full ({capacity} messages)")]
    QueueFull {
        /// Destination name
        destination: String,
        /// Queue capacity
        capacity: usize,
    },

    /// The queue no longer accepts messages.
    #[error("The queue of destination '{destination}' is closed")]
    QueueClosed {
        /// Destination name
        destination: String,
    },
}

/// Error starting, stopping or joining a destination worker.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start` was called outside a Tokio runtime.
    #[error("No Tokio runtime available to spawn the delivery worker")]
    NoRuntime,

    /// The worker task panicked.
    #[error("Delivery worker of '{destination}' panicked: {reason}")]
    WorkerPanicked {
        /// Destination name
        destination: String,
        /// Panic description from the join error
        reason: String,
    },
}
