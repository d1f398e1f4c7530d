//! Process-wide inputs shared by every destination a registry builds.

use std::num::NonZeroUsize;

use url::Url;

use crate::provider::RetryPolicy;

/// Base URL of the public Telegram Bot API.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Construction settings handed to every destination constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationSettings {
    /// Base URL of the chat API.
    pub api_url: Url,
    /// Capacity of each destination's queue.
    pub queue_capacity: NonZeroUsize,
    /// Retry policy applied by each provider.
    pub retry_policy: RetryPolicy,
}

impl DestinationSettings {
    /// Creates settings for `api_url` with default capacity and retries.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry_policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_public_api() {
        let settings = DestinationSettings::new(Url::parse(TELEGRAM_API_URL).unwrap());

        assert_eq!(settings.queue_capacity.get(), 1000);
        assert_eq!(settings.retry_policy, RetryPolicy::default());
        assert_eq!(settings.api_url.as_str(), "https://api.telegram.org/");
    }

    #[test]
    fn builders_override_fields() {
        let settings = DestinationSettings::new(Url::parse("http://localhost:8081").unwrap())
            .with_queue_capacity(NonZeroUsize::new(5).unwrap())
            .with_retry_policy(RetryPolicy::default().with_max_retries(1));

        assert_eq!(settings.queue_capacity.get(), 5);
        assert_eq!(settings.retry_policy.max_retries, 1);
    }
}
