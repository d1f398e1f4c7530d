//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::destination::{DestinationSettings, DestinationUri, MASK};
use crate::provider::RetryPolicy;

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
///
/// Destination URIs carry bot tokens, so the `Display` form only reports
/// how many there are and `Debug` prints their redacted descriptions.
pub struct ValidatedConfig {
    /// Destination URIs, in configuration order (at least one)
    pub destinations: Vec<String>,

    /// Base URL of the chat API
    pub api_url: Url,

    /// Capacity of each destination queue
    pub queue_capacity: NonZeroUsize,

    /// Retry policy applied to every destination
    pub retry_policy: RetryPolicy,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ destinations: {}, api_url: {}, queue_capacity: {}, \
             retry: {}x/{}s (budget {}s) }}",
            self.destinations.len(),
            self.api_url,
            self.queue_capacity,
            self.retry_policy.max_retries,
            self.retry_policy.initial_delay.as_secs(),
            self.retry_policy.max_backoff.as_secs(),
        )
    }
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let destinations: Vec<String> = self
            .destinations
            .iter()
            .map(|raw| {
                DestinationUri::parse(raw).map_or_else(|_| MASK.to_string(), |uri| uri.describe())
            })
            .collect();

        f.debug_struct("ValidatedConfig")
            .field("destinations", &destinations)
            .field("api_url", &self.api_url)
            .field("queue_capacity", &self.queue_capacity)
            .field("retry_policy", &self.retry_policy)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values. Destinations
    /// given on the command line replace the TOML list entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No destination is configured
    /// - The API URL is invalid
    /// - The queue capacity is zero
    /// - Retry delays are zero or inconsistent
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let destinations = Self::resolve_destinations(cli, toml)?;
        let api_url = Self::resolve_api_url(cli, toml)?;
        let queue_capacity = Self::resolve_queue_capacity(cli, toml)?;
        let retry_policy = Self::build_retry_policy(cli, toml)?;

        Ok(Self {
            destinations,
            api_url,
            queue_capacity,
            retry_policy,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    /// Settings shared by every destination built from this configuration.
    #[must_use]
    pub fn destination_settings(&self) -> DestinationSettings {
        DestinationSettings::new(self.api_url.clone())
            .with_queue_capacity(self.queue_capacity)
            .with_retry_policy(self.retry_policy.clone())
    }

    fn resolve_destinations(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Vec<String>, ConfigError> {
        let destinations = if cli.destinations.is_empty() {
            toml.map(|t| t.destinations.clone()).unwrap_or_default()
        } else {
            cli.destinations.clone()
        };

        if destinations.is_empty() {
            return Err(ConfigError::missing(
                field::DESTINATIONS,
                "Pass destination URIs as arguments or set destinations in config file",
            ));
        }

        Ok(destinations)
    }

    fn resolve_api_url(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Url, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let url_str = cli
            .api_url
            .as_deref()
            .or_else(|| toml.and_then(|t| t.relay.api_url.as_deref()))
            .unwrap_or(defaults::API_URL);

        let url = Url::parse(url_str).map_err(|e| ConfigError::InvalidUrl {
            url: url_str.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: url_str.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }

        Ok(url)
    }

    fn resolve_queue_capacity(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<NonZeroUsize, ConfigError> {
        let capacity = cli
            .queue_capacity
            .or_else(|| toml.and_then(|t| t.relay.queue_capacity))
            .unwrap_or(defaults::QUEUE_CAPACITY);

        NonZeroUsize::new(capacity).ok_or(ConfigError::InvalidCapacity)
    }

    fn build_retry_policy(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<RetryPolicy, ConfigError> {
        let retry = toml.map(|t| &t.retry);

        // Priority: CLI explicit > TOML > default
        let max_retries = cli
            .retry_max
            .or_else(|| retry.and_then(|r| r.max_retries))
            .unwrap_or(defaults::RETRY_MAX_RETRIES);

        let initial_delay_secs = cli
            .retry_delay
            .or_else(|| retry.and_then(|r| r.initial_delay))
            .unwrap_or(defaults::RETRY_INITIAL_DELAY_SECS);

        // TOML only
        let max_backoff_secs = retry
            .and_then(|r| r.max_backoff)
            .unwrap_or(defaults::RETRY_MAX_BACKOFF_SECS);

        if initial_delay_secs == 0 {
            return Err(ConfigError::InvalidRetry(
                "initial_delay must be greater than 0".to_string(),
            ));
        }

        if max_backoff_secs < initial_delay_secs {
            return Err(ConfigError::InvalidRetry(format!(
                "max_backoff ({max_backoff_secs}s) must be >= initial_delay ({initial_delay_secs}s)"
            )));
        }

        Ok(RetryPolicy::new()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_secs(initial_delay_secs))
            .with_max_backoff(Duration::from_secs(max_backoff_secs)))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}
