//! Scheme to constructor lookup for destination URIs.

use std::collections::HashMap;
use std::fmt;

use super::telegram::{ALIAS, SCHEME, TelegramDestination};
use super::{BuildError, Destination, DestinationSettings, DestinationUri, Destinations};

/// Factory building one destination from its parsed URI.
pub type Constructor = Box<
    dyn Fn(&DestinationUri, &DestinationSettings) -> Result<Box<dyn Destination>, BuildError>
        + Send
        + Sync,
>;

/// Maps URI schemes to destination constructors.
///
/// A registry is a plain value: callers populate it at startup and pass it
/// to whatever builds destinations. All destinations it builds share the
/// same [`DestinationSettings`].
pub struct DestinationRegistry {
    settings: DestinationSettings,
    constructors: HashMap<String, Constructor>,
}

impl DestinationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(settings: DestinationSettings) -> Self {
        Self {
            settings,
            constructors: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in Telegram type registered under
    /// `telegram` and `relay`.
    #[must_use]
    pub fn with_builtin(settings: DestinationSettings) -> Self {
        let mut registry = Self::new(settings);
        for scheme in [SCHEME, ALIAS] {
            registry.register(scheme, |uri, settings| {
                let destination = TelegramDestination::from_uri(uri, settings)?;
                Ok(Box::new(destination) as Box<dyn Destination>)
            });
        }
        registry
    }

    /// Associates `scheme` with a constructor, replacing any previous one.
    pub fn register<F>(&mut self, scheme: impl Into<String>, constructor: F)
    where
        F: Fn(&DestinationUri, &DestinationSettings) -> Result<Box<dyn Destination>, BuildError>
            + Send
            + Sync
            + 'static,
    {
        let scheme = scheme.into().to_ascii_lowercase();
        if self
            .constructors
            .insert(scheme.clone(), Box::new(constructor))
            .is_some()
        {
            tracing::debug!("Replaced constructor for scheme '{scheme}'");
        }
    }

    /// Registered schemes, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    #[must_use]
    pub const fn settings(&self) -> &DestinationSettings {
        &self.settings
    }

    /// Builds a destination from a URI string.
    ///
    /// # Errors
    ///
    /// - [`BuildError::InvalidUri`] if the string does not parse
    /// - [`BuildError::UnknownDestinationType`] if no constructor matches
    /// - whatever the constructor returns
    pub fn build(&self, raw: &str) -> Result<Box<dyn Destination>, BuildError> {
        let uri = DestinationUri::parse(raw)?;
        let constructor = self.constructors.get(uri.scheme()).ok_or_else(|| {
            BuildError::UnknownDestinationType {
                scheme: uri.scheme().to_string(),
            }
        })?;

        let destination = constructor(&uri, &self.settings)?;
        tracing::debug!("Built destination '{}' from {uri}", destination.name());
        Ok(destination)
    }

    /// Builds every URI in order, failing on the first error.
    ///
    /// # Errors
    ///
    /// Returns the first build error; nothing built so far is returned.
    pub fn build_all<I, T>(&self, uris: I) -> Result<Vec<Box<dyn Destination>>, BuildError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        uris.into_iter().map(|raw| self.build(raw.as_ref())).collect()
    }

    /// Builds every URI into a name-keyed set.
    ///
    /// # Errors
    ///
    /// Same as [`build_all`](Self::build_all).
    pub fn build_set<I, T>(&self, uris: I) -> Result<Destinations, BuildError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Ok(self.build_all(uris)?.into_iter().collect())
    }
}

impl fmt::Debug for DestinationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationRegistry")
            .field("settings", &self.settings)
            .field("schemes", &self.schemes())
            .finish()
    }
}
