//! Configuration sources consulted by provider configuration probes.
//!
//! Providers decide whether they are configured by looking up named keys
//! (credential ids, secrets, tokens, account ids). The lookup goes through
//! [`ConfigSource`] so probes can run against the process environment in
//! production and against an in-memory map in tests.

use std::collections::HashMap;
use std::fmt::Debug;

/// Read-only key/value configuration.
///
/// Implementations must be cheap and side-effect free: probes call them
/// during discovery and must never perform I/O beyond reading local state.
///
/// # Example
///
/// ```rust
/// use admetrix::{ConfigSource, StaticConfig};
///
/// let config = StaticConfig::new()
///     .with("META_ACCESS_TOKEN", "token")
///     .with("META_AD_ACCOUNT_ID", "   ");
///
/// assert!(config.has("META_ACCESS_TOKEN"));
/// assert!(!config.has("META_AD_ACCOUNT_ID"));
/// assert!(!config.has_all(&["META_ACCESS_TOKEN", "META_AD_ACCOUNT_ID"]));
/// ```
pub trait ConfigSource: Send + Sync + Debug {
    /// Returns the raw value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns the trimmed value for `key` when it is present and non-blank.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Check whether `key` is present and non-blank.
    fn has(&self, key: &str) -> bool {
        self.get_non_empty(key).is_some()
    }

    /// Check whether every key in `keys` is present and non-blank.
    fn has_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.has(key))
    }
}

/// Configuration backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl EnvConfig {
    /// Create a new environment-backed source.
    pub fn new() -> Self {
        Self
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory configuration, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    values: HashMap<String, String>,
}

impl StaticConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set a key in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl ConfigSource for StaticConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for StaticConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_config_lookup() {
        let config = StaticConfig::new()
            .with("A", "1")
            .with("B", "  two  ");

        assert_eq!(config.get("A").as_deref(), Some("1"));
        assert_eq!(config.get_non_empty("B").as_deref(), Some("two"));
        assert!(config.get("C").is_none());
    }

    #[test]
    fn test_blank_values_are_absent() {
        let config = StaticConfig::new().with("EMPTY", "").with("SPACES", "   ");

        assert!(!config.has("EMPTY"));
        assert!(!config.has("SPACES"));
        assert!(!config.has("MISSING"));
    }

    #[test]
    fn test_has_all() {
        let config: StaticConfig = [("ID", "x"), ("SECRET", "y")].into_iter().collect();

        assert!(config.has_all(&["ID", "SECRET"]));
        assert!(config.has_all(&[]));
        assert!(!config.has_all(&["ID", "TOKEN"]));
    }

    #[test]
    fn test_env_config_missing_key() {
        let config = EnvConfig::new();
        assert!(!config.has("ADMETRIX_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
