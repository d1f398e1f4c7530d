//! The built-in destination type, backed by the Telegram Bot API.

use std::num::NonZeroUsize;

use crate::message::{Message, TelegramMessage};
use crate::provider::{HttpClient, ProviderOptions, ReqwestClient, TelegramProvider};
use crate::time::{Sleeper, TokioSleeper};

use super::outbox::{Outbox, WorkerHandle};
use super::{BuildError, Destination, DestinationSettings, DestinationUri, LifecycleError, SubmitError};

/// Scheme the built-in type is registered under.
pub const SCHEME: &str = "telegram";

/// Alternative scheme for the same type.
pub const ALIAS: &str = "relay";

/// A named chat target with its own queue and delivery worker.
///
/// Built from `scheme://token@chat_id/name?timeout=<seconds>`. Messages are
/// delivered in submission order through a [`TelegramProvider`].
pub struct TelegramDestination<H = ReqwestClient, S = TokioSleeper>
where
    H: HttpClient + 'static,
    S: Sleeper + 'static,
{
    uri: DestinationUri,
    outbox: Outbox<TelegramProvider<H, S>>,
}

impl TelegramDestination {
    /// Builds a destination using a fresh reqwest client.
    ///
    /// # Errors
    ///
    /// Fails if the URI lacks a credential or chat, if its `timeout` option
    /// is invalid, or if the HTTP client cannot be created.
    pub fn from_uri(uri: &DestinationUri, settings: &DestinationSettings) -> Result<Self, BuildError> {
        let client = ReqwestClient::new().map_err(|e| BuildError::HttpClient(Box::new(e)))?;
        Self::with_client(uri, settings, client)
    }
}

impl<H: HttpClient + 'static> TelegramDestination<H, TokioSleeper> {
    /// Builds a destination delivering through `client`.
    ///
    /// # Errors
    ///
    /// Same as [`from_uri`](TelegramDestination::from_uri), minus client
    /// creation.
    pub fn with_client(
        uri: &DestinationUri,
        settings: &DestinationSettings,
        client: H,
    ) -> Result<Self, BuildError> {
        let credential = uri.credential();
        if credential.is_empty() {
            return Err(invalid(uri, "missing bot token"));
        }
        if uri.host().is_empty() {
            return Err(invalid(uri, "missing chat identifier"));
        }

        let pairs = uri.query_pairs();
        let options =
            ProviderOptions::from_query(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

        let provider = TelegramProvider::new(client, &settings.api_url, &credential, uri.host())
            .map_err(|e| invalid(uri, &e.to_string()))?
            .with_options(options)
            .with_retry_policy(settings.retry_policy.clone());

        Ok(Self::with_provider(uri.clone(), provider, settings.queue_capacity))
    }
}

impl<H, S> TelegramDestination<H, S>
where
    H: HttpClient + 'static,
    S: Sleeper + 'static,
{
    /// Wraps an already configured provider.
    #[must_use]
    pub fn with_provider(
        uri: DestinationUri,
        provider: TelegramProvider<H, S>,
        capacity: NonZeroUsize,
    ) -> Self {
        let outbox = Outbox::new(uri.name(), provider, capacity);
        Self { uri, outbox }
    }

    #[must_use]
    pub fn uri(&self) -> &DestinationUri {
        &self.uri
    }

    #[must_use]
    pub fn provider(&self) -> &TelegramProvider<H, S> {
        self.outbox.sender()
    }

    fn accept(message: Message) -> Result<TelegramMessage, SubmitError> {
        match message {
            Message::Telegram(message) => Ok(message),
            Message::Json(value) => {
                serde_json::from_value(value).map_err(|e| SubmitError::InvalidMessageType {
                    expected: SCHEME,
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl<H, S> Destination for TelegramDestination<H, S>
where
    H: HttpClient + 'static,
    S: Sleeper + 'static,
{
    fn name(&self) -> &str {
        self.uri.name()
    }

    fn describe(&self) -> String {
        self.uri.describe()
    }

    fn empty_message(&self) -> Message {
        Message::Telegram(TelegramMessage::default())
    }

    fn submit(&self, message: Message) -> Result<(), SubmitError> {
        let message = Self::accept(message)?;
        self.outbox.push(message)?;
        tracing::debug!("Queued message for destination '{}'", self.name());
        Ok(())
    }

    fn start(&self) -> Result<(), LifecycleError> {
        self.outbox.start()
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.outbox.stop();
        Ok(())
    }

    fn shutdown(&self) -> Option<WorkerHandle> {
        self.outbox.shutdown()
    }

    fn is_running(&self) -> bool {
        self.outbox.is_running()
    }

    fn queued(&self) -> usize {
        self.outbox.len()
    }

    fn capacity(&self) -> usize {
        self.outbox.capacity()
    }
}

impl<H, S> std::fmt::Debug for TelegramDestination<H, S>
where
    H: HttpClient + 'static,
    S: Sleeper + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramDestination")
            .field("uri", &self.uri)
            .field("outbox", &self.outbox)
            .finish()
    }
}

fn invalid(uri: &DestinationUri, reason: &str) -> BuildError {
    BuildError::InvalidUri {
        uri: uri.describe(),
        reason: reason.to_string(),
    }
}
