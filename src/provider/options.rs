//! Per-destination provider options read from the URI query string.

use std::time::Duration;

use super::InvalidTimeout;

/// Options recognized in a destination URI query.
///
/// Only `timeout` (positive whole seconds) is understood; any other key is
/// ignored. An empty value counts as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ProviderOptions {
    /// Query key for the request timeout.
    pub const TIMEOUT: &'static str = "timeout";

    /// Timeout used when the URI does not override it.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Extracts options from query pairs.
    ///
    /// When a key is repeated, its first non-empty value wins.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTimeout`] if `timeout` is not a positive integer.
    pub fn from_query<'a, I>(pairs: I) -> Result<Self, InvalidTimeout>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let raw_timeout = pairs
            .into_iter()
            .find(|(key, value)| *key == Self::TIMEOUT && !value.is_empty())
            .map(|(_, value)| value);

        let timeout = match raw_timeout {
            Some(value) => parse_timeout(value)?,
            None => Self::DEFAULT_TIMEOUT,
        };

        Ok(Self { timeout })
    }
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

fn parse_timeout(value: &str) -> Result<Duration, InvalidTimeout> {
    let seconds = value.parse::<u32>().map_err(|e| InvalidTimeout {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if seconds == 0 {
        return Err(InvalidTimeout {
            value: value.to_string(),
            reason: "must be a positive number of seconds".to_string(),
        });
    }

    Ok(Duration::from_secs(u64::from(seconds)))
}
