//! Named chat destinations built from URIs.
//!
//! A destination owns a bounded queue and a single delivery worker. It is
//! built by a [`DestinationRegistry`] from a URI of the form
//! `scheme://credential@host/name?options`, collected with others into a
//! name-keyed [`Destinations`] set, started, and fed with messages.
//!
//! Submission never waits for the network: [`Destination::submit`] only
//! reports whether the message was queued. Delivery outcomes are logged by
//! the worker.

mod error;
mod outbox;
mod registry;
mod set;
mod settings;
mod telegram;
mod uri;


use std::fmt;

use crate::message::Message;

pub use error::{BuildError, LifecycleError, SubmitError};
pub use outbox::{Outbox, WorkerHandle};
pub use registry::{Constructor, DestinationRegistry};
pub use set::Destinations;
pub use settings::{DEFAULT_QUEUE_CAPACITY, DestinationSettings, TELEGRAM_API_URL};
pub use telegram::{ALIAS as TELEGRAM_ALIAS, SCHEME as TELEGRAM_SCHEME, TelegramDestination};
pub use uri::{DestinationUri, MASK};

/// A running or stopped chat target.
///
/// Lifecycle: `start` on a stopped destination spawns a worker; `start` on a
/// running one replaces its worker; `stop` cancels the worker and is a no-op
/// when stopped. Messages submitted while stopped are queued.
pub trait Destination: Send + Sync {
    /// Unique name: the URI path without surrounding slashes.
    fn name(&self) -> &str;

    /// URI with the credential masked. Safe to log.
    fn describe(&self) -> String;

    /// A zero-valued message of the accepted shape.
    ///
    /// Front ends decode incoming payloads against it with
    /// [`Message::decode`].
    fn empty_message(&self) -> Message;

    /// Queues a message without waiting.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::InvalidMessageType`] if the message has the wrong shape
    /// - [`SubmitError::QueueFull`] if the queue has no free slot
    fn submit(&self, message: Message) -> Result<(), SubmitError>;

    /// Spawns the delivery worker, replacing a running one.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NoRuntime`] outside a Tokio runtime.
    fn start(&self) -> Result<(), LifecycleError>;

    /// Cancels the delivery worker without waiting for it.
    ///
    /// # Errors
    ///
    /// The built-in type never fails to stop.
    fn stop(&self) -> Result<(), LifecycleError>;

    /// Cancels the worker and returns its handle for joining.
    fn shutdown(&self) -> Option<WorkerHandle>;

    fn is_running(&self) -> bool;

    /// Messages waiting in the queue.
    fn queued(&self) -> usize;

    fn capacity(&self) -> usize;
}

impl fmt::Debug for dyn Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("name", &self.name())
            .field("uri", &self.describe())
            .field("running", &self.is_running())
            .finish()
    }
}
