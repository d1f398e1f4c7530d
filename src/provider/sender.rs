//! Message sender trait.

use std::fmt;

use super::DeliveryError;

/// Delivers one message to an external chat service.
///
/// Implementations own their retry behavior: a returned error is final for
/// that message. The destination worker calls `send` for each queued message
/// in order and never retries on its own.
pub trait MessageSender: Send + Sync + 'static {
    /// The message shape this sender accepts.
    type Message: fmt::Debug + Send + Sync + 'static;

    /// Sends a message, retrying transient failures internally.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the message could not be delivered.
    fn send(
        &self,
        message: &Self::Message,
    ) -> impl std::future::Future<Output = Result<(), DeliveryError>> + Send;
}
