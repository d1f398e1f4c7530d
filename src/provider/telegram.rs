//! Telegram Bot API provider with timeout and retry support.

use std::time::Duration;

use serde::Serialize;

use crate::message::TelegramMessage;
use crate::time::{Sleeper, TokioSleeper};

use super::{
    AttemptError, DeliveryError, HttpClient, HttpError, HttpRequest, MessageSender,
    ProviderOptions, RetryPolicy,
};

/// Sends messages to one chat through the Bot API `sendMessage` method.
///
/// Every attempt is bounded by the configured timeout. Failed attempts are
/// classified by the [`RetryPolicy`]: transient failures are retried with
/// exponential backoff, fatal statuses end the delivery at once.
///
/// # Type Parameters
///
/// - `H`: The HTTP client implementation
/// - `S`: The sleeper used between retries (defaults to [`TokioSleeper`])
///
/// # Example
///
/// ```
/// use chat_relay::provider::{ReqwestClient, TelegramProvider};
/// use url::Url;
///
/// let api = Url::parse("https://api.telegram.org").unwrap();
/// let provider = TelegramProvider::new(
///     ReqwestClient::new().unwrap(),
///     &api,
///     "123456:secret",
///     "-100200300",
/// )
/// .unwrap();
///
/// assert_eq!(provider.chat_id(), "-100200300");
/// ```
#[derive(Debug)]
pub struct TelegramProvider<H, S = TokioSleeper> {
    client: H,
    sleeper: S,
    endpoint: url::Url,
    chat_id: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

/// Request body: the message fields plus the target chat.
#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    #[serde(flatten)]
    message: &'a TelegramMessage,
}

impl<H> TelegramProvider<H, TokioSleeper> {
    /// Creates a provider posting to `{api_url}/bot{token}/sendMessage`.
    ///
    /// Uses the default timeout and retry policy.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the endpoint URL cannot be formed.
    pub fn new(
        client: H,
        api_url: &url::Url,
        token: &str,
        chat_id: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        let base = api_url.as_str().trim_end_matches('/');
        let endpoint = url::Url::parse(&format!("{base}/bot{token}/sendMessage"))?;

        Ok(Self {
            client,
            sleeper: TokioSleeper,
            endpoint,
            chat_id: chat_id.into(),
            timeout: ProviderOptions::DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        })
    }
}

impl<H, S> TelegramProvider<H, S> {
    /// Sets a custom sleeper for retry delays.
    #[must_use]
    pub fn with_sleeper<S2>(self, sleeper: S2) -> TelegramProvider<H, S2> {
        TelegramProvider {
            client: self.client,
            sleeper,
            endpoint: self.endpoint,
            chat_id: self.chat_id,
            timeout: self.timeout,
            retry_policy: self.retry_policy,
        }
    }

    /// Applies options parsed from the destination URI.
    #[must_use]
    pub const fn with_options(mut self, options: ProviderOptions) -> Self {
        self.timeout = options.timeout;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Returns the `sendMessage` endpoint.
    ///
    /// The URL embeds the bot token; do not log it.
    #[must_use]
    pub const fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Returns the target chat identifier.
    #[must_use]
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

impl<H: HttpClient, S: Sleeper> TelegramProvider<H, S> {
    fn build_request(&self, message: &TelegramMessage) -> Result<HttpRequest, DeliveryError> {
        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            message,
        };
        let body = serde_json::to_vec(&payload)?;

        Ok(HttpRequest::post_json(self.endpoint.clone(), body))
    }

    /// Executes a single attempt bounded by the timeout.
    async fn execute_request(&self, request: &HttpRequest) -> Result<(), AttemptError> {
        let response = tokio::time::timeout(self.timeout, self.client.request(request.clone()))
            .await
            .map_err(|_| HttpError::Timeout)??;

        if response.is_success() {
            return Ok(());
        }

        Err(AttemptError::NonSuccessStatus {
            status: response.status,
            body: response.body_text().map(ToString::to_string),
        })
    }

    async fn send_with_retry(&self, message: &TelegramMessage) -> Result<(), DeliveryError> {
        let request = self.build_request(message)?;
        let mut waited = Duration::ZERO;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let error = match self.execute_request(&request).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if !self.retry_policy.is_retryable(&error) {
                return Err(DeliveryError::Rejected(error));
            }

            let Some(delay) = self.retry_policy.next_delay(attempt - 1, waited) else {
                return Err(DeliveryError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error,
                });
            };

            tracing::warn!(
                "Attempt {attempt} to chat {} failed: {error}; retrying in {delay:?}",
                self.chat_id
            );
            self.sleeper.sleep(delay).await;
            waited += delay;
        }
    }
}

impl<H, S> MessageSender for TelegramProvider<H, S>
where
    H: HttpClient + 'static,
    S: Sleeper + 'static,
{
    type Message = TelegramMessage;

    async fn send(&self, message: &TelegramMessage) -> Result<(), DeliveryError> {
        self.send_with_retry(message).await
    }
}
