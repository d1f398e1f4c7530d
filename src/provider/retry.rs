//! Retry policy for chat deliveries.

use std::time::Duration;

use super::{AttemptError, HttpError};

/// Retry behavior for a delivery: how often, how long to wait, and which
/// responses are final.
///
/// Delays grow exponentially from `initial_delay` by `multiplier`. The sum of
/// all delays for one delivery never exceeds `max_backoff`; once that budget
/// is spent no further retry is made even if `max_retries` allows it.
///
/// # Defaults
///
/// - `max_retries`: 4 (five attempts in total)
/// - `initial_delay`: 1 second
/// - `multiplier`: 2.0
/// - `max_backoff`: 32 seconds
/// - `fatal_statuses`: 400, 404
///
/// # Example
///
/// ```
/// use chat_relay::provider::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new()
///     .with_max_retries(2)
///     .with_initial_delay(Duration::from_millis(200));
///
/// assert_eq!(policy.max_attempts(), 3);
/// assert!(policy.is_fatal(http::StatusCode::NOT_FOUND));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Factor applied to the delay after each retry.
    pub multiplier: f64,

    /// Upper bound on the total time spent waiting between attempts.
    pub max_backoff: Duration,

    /// Statuses that mean the request itself is wrong; never retried.
    pub fatal_statuses: Vec<http::StatusCode>,
}

impl RetryPolicy {
    /// Default number of retries.
    pub const DEFAULT_MAX_RETRIES: u32 = 4;

    /// Default initial delay (1 second).
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

    /// Default multiplier (2.0).
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;

    /// Default cumulative backoff budget (32 seconds).
    pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(32);

    /// Default fatal statuses: malformed request and unknown chat.
    pub const DEFAULT_FATAL_STATUSES: [http::StatusCode; 2] =
        [http::StatusCode::BAD_REQUEST, http::StatusCode::NOT_FOUND];

    /// Creates a policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            multiplier: Self::DEFAULT_MULTIPLIER,
            max_backoff: Self::DEFAULT_MAX_BACKOFF,
            fatal_statuses: Self::DEFAULT_FATAL_STATUSES.to_vec(),
        }
    }

    /// Sets the number of retries. Zero disables retrying.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry.
    ///
    /// Zero is allowed, which is mostly useful in tests.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the delay multiplier.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier` is not positive.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier > 0.0, "multiplier must be positive");
        self.multiplier = multiplier;
        self
    }

    /// Sets the cumulative backoff budget.
    #[must_use]
    pub const fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Replaces the set of fatal statuses.
    #[must_use]
    pub fn with_fatal_statuses(
        mut self,
        statuses: impl IntoIterator<Item = http::StatusCode>,
    ) -> Self {
        self.fatal_statuses = statuses.into_iter().collect();
        self
    }

    /// Total attempts allowed, including the first one.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns true if `status` must not be retried.
    #[must_use]
    pub fn is_fatal(&self, status: http::StatusCode) -> bool {
        self.fatal_statuses.contains(&status)
    }

    /// Returns true if a failed attempt is worth repeating.
    ///
    /// Connection failures, timeouts and any non-fatal error status are
    /// transient. Invalid URLs and fatal statuses are not.
    #[must_use]
    pub fn is_retryable(&self, error: &AttemptError) -> bool {
        match error {
            AttemptError::Http(HttpError::Connection(_) | HttpError::Timeout) => true,
            AttemptError::Http(HttpError::InvalidUrl(_)) => false,
            AttemptError::NonSuccessStatus { status, .. } => !self.is_fatal(*status),
        }
    }

    /// Uncapped exponential delay before the given retry (0-indexed).
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        // retry is bounded by max_retries, far below i32::MAX
        #[allow(clippy::cast_possible_wrap)]
        let factor = self.multiplier.powi(retry as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Delay to wait before the given retry, or `None` if no retry is allowed.
    ///
    /// `waited` is the time already spent backing off for this delivery. The
    /// returned delay is clamped so that `waited + delay <= max_backoff`.
    #[must_use]
    pub fn next_delay(&self, retry: u32, waited: Duration) -> Option<Duration> {
        if retry >= self.max_retries {
            return None;
        }

        let delay = self.delay_for_retry(retry);
        let remaining = self.max_backoff.saturating_sub(waited);

        if remaining.is_zero() && !delay.is_zero() {
            return None;
        }

        Some(delay.min(remaining))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
