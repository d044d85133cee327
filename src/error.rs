//! Error types for Admetrix.
//!
//! Only genuine upstream failures are errors. Missing configuration, empty
//! data, malformed individual rows and zero denominators are all normal
//! outcomes and never surface here.

use thiserror::Error;

/// Root error type for Admetrix operations.
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// Provider-related errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Discovery-related errors
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Registry-related errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Caller supplied a date range that cannot be parsed or is inverted
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

/// Failures surfacing from a platform's raw-fetch collaborator.
///
/// Providers propagate these unchanged; retry policy belongs to the
/// collaborator and the user-facing message to the presentation layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Credentials were rejected or could not be minted
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Platform throttled the request
    #[error("Rate limited by platform{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited {
        /// Seconds the platform asked us to wait, if it said
        retry_after_secs: Option<u64>,
    },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Platform answered with a body we could not interpret as a whole
    #[error("Malformed platform response: {0}")]
    MalformedResponse(String),

    /// Platform answered with a non-success status
    #[error("Platform returned status {status}: {message}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Platform-supplied message
        message: String,
    },

    /// Collaborator gave up waiting
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Provider task panicked before producing a result
    #[error("Provider task panicked: {0}")]
    Panicked(String),
}

/// Failures raised while probing or constructing a candidate provider.
///
/// These never escape discovery: the registry logs them and skips the
/// candidate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    /// A configuration value was present but unusable
    #[error("Invalid configuration for {key}: {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// A configuration value the constructor relies on was missing
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Provider construction failed
    #[error("Provider initialization failed: {0}")]
    InitializationFailed(String),

    /// Probe or constructor panicked
    #[error("Provider panicked during {stage}: {message}")]
    Panicked {
        /// Discovery stage ("probe" or "construct")
        stage: &'static str,
        /// Panic payload, when it was a string
        message: String,
    },
}

/// Errors that can occur in registry operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Provider already registered with this name
    #[error("Provider already registered: {0}")]
    AlreadyRegistered(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::MalformedResponse(err.to_string())
    }
}

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for discovery probes and constructors.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for general Admetrix operations.
pub type AggregatorResult<T> = Result<T, AggregatorError>;
