//! Provider trait and utilities shared by every capability domain.
//!
//! The `Provider` trait carries identity and health. Each domain contract in
//! [`crate::contracts`] extends it with read operations, and [`Discoverable`]
//! adds the static configuration probe the registry consults at startup.

use std::any::Any;
use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ConfigSource;
use crate::error::DiscoveryResult;

/// Base trait for all integration providers.
///
/// Providers are long-lived shared singletons: the registry hands out
/// `Arc<dyn Contract>` handles and many tasks call them concurrently.
///
/// # Example
///
/// ```rust
/// use admetrix::Provider;
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct Example;
///
/// impl Provider for Example {
///     fn name(&self) -> &str {
///         "example"
///     }
///
///     fn display_name(&self) -> &str {
///         "Example Platform"
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short machine key, unique within a domain.
    fn name(&self) -> &str;

    /// Human-readable label.
    fn display_name(&self) -> &str;

    /// Report whether the provider can currently serve requests.
    ///
    /// The default is a static "ok". Providers with a cheap live probe
    /// override this; a failed probe is reported in the status rather than
    /// returned as an error.
    async fn health_check(&self) -> HealthStatus {
        HealthStatus::ok(self.name())
    }

    /// Downcast to concrete type for advanced usage.
    fn as_any(&self) -> &dyn Any;
}

/// Static configuration probe and constructor used during discovery.
///
/// `is_configured` is a pure predicate over configuration: no network I/O,
/// and missing configuration is `false`, never an error. Only types that
/// fully implement a domain contract and this trait can be declared as
/// registry candidates.
pub trait Discoverable: Sized {
    /// Raw-fetch collaborator the provider is built around.
    type Collaborator: ?Sized + Send + Sync;

    /// Check whether the configuration required by this provider is present.
    fn is_configured(config: &dyn ConfigSource) -> bool;

    /// Construct the provider from configuration.
    fn from_config(
        config: &dyn ConfigSource,
        collaborator: Arc<Self::Collaborator>,
    ) -> DiscoveryResult<Self>;
}

/// Outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Ok,
    Error,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Ok => f.write_str("ok"),
            HealthState::Error => f.write_str("error"),
        }
    }
}

/// Health report tagged with the provider's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthStatus {
    /// A healthy report.
    pub fn ok(provider: impl Into<String>) -> Self {
        Self {
            status: HealthState::Ok,
            provider: provider.into(),
            detail: None,
        }
    }

    /// An unhealthy report with a reason.
    pub fn error(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: HealthState::Error,
            provider: provider.into(),
            detail: Some(detail.into()),
        }
    }

    /// Check whether the report is healthy.
    pub fn is_ok(&self) -> bool {
        self.status == HealthState::Ok
    }
}

/// Extension trait for provider type checking.
pub trait ProviderExt: Provider {
    /// Check if this provider is of type T.
    fn is<T: Provider + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to type T.
    fn downcast_ref<T: Provider + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl<P: Provider + ?Sized> ProviderExt for P {}
