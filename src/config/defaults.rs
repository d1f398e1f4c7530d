//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

pub use crate::destination::TELEGRAM_API_URL as API_URL;

/// Default file name written by `init`.
pub const CONFIG_FILE: &str = "chat-relay.toml";

/// Default capacity of each destination queue.
pub const QUEUE_CAPACITY: usize = 1000;

/// Default maximum number of retries after the first attempt.
pub const RETRY_MAX_RETRIES: u32 = 4;

/// Default initial retry delay in seconds.
pub const RETRY_INITIAL_DELAY_SECS: u64 = 1;

/// Default cumulative backoff budget in seconds.
pub const RETRY_MAX_BACKOFF_SECS: u64 = 32;

/// Default initial retry delay as Duration.
#[must_use]
pub const fn retry_initial_delay() -> Duration {
    Duration::from_secs(RETRY_INITIAL_DELAY_SECS)
}

/// Default cumulative backoff budget as Duration.
#[must_use]
pub const fn retry_max_backoff() -> Duration {
    Duration::from_secs(RETRY_MAX_BACKOFF_SECS)
}
