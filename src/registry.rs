//! Capability registry.
//!
//! Discovery is a single pass over a static, per-domain list of candidate
//! providers. A [`RegistryBuilder`] holds the declared candidates; calling
//! [`RegistryBuilder::discover`] probes and constructs them and yields an
//! immutable [`CapabilityRegistry`]. Nothing a candidate does during
//! discovery (an error, a panic, a duplicate name) can abort the pass.

use std::any::{self, Any};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ConfigSource;
use crate::contracts::{AdsProvider, AnalyticsProvider, Domain, FinanceProvider, NotificationProvider};
use crate::error::{DiscoveryError, DiscoveryResult, RegistryError, RegistryResult};
use crate::provider::{Discoverable, Provider};

/// Ordered set of constructed providers for one domain.
///
/// The first registered provider is the domain's primary. Names are unique
/// within a set.
///
/// # Example
///
/// ```rust
/// use admetrix::{Provider, ProviderSet};
/// use std::any::Any;
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct Example(&'static str);
///
/// impl Provider for Example {
///     fn name(&self) -> &str { self.0 }
///     fn display_name(&self) -> &str { "Example" }
///     fn as_any(&self) -> &dyn Any { self }
/// }
///
/// let mut set: ProviderSet<dyn Provider> = ProviderSet::new();
/// set.register_unique(Arc::new(Example("a"))).unwrap();
/// set.register_unique(Arc::new(Example("b"))).unwrap();
///
/// assert!(set.register_unique(Arc::new(Example("a"))).is_err());
/// assert_eq!(set.primary().map(|p| p.name()), Some("a"));
/// assert_eq!(set.names(), vec!["a", "b"]);
/// ```
#[derive(Debug)]
pub struct ProviderSet<P: ?Sized> {
    providers: HashMap<String, Arc<P>>,
    ordered: Vec<String>,
}

impl<P: Provider + ?Sized> ProviderSet<P> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            ordered: Vec::new(),
        }
    }

    /// Register a provider, returning an error if its name is taken.
    pub fn register_unique(&mut self, provider: Arc<P>) -> RegistryResult<()> {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.ordered.push(name.clone());
        self.providers.insert(name, provider);
        Ok(())
    }

    /// The first registered provider.
    pub fn primary(&self) -> Option<&Arc<P>> {
        self.ordered.first().and_then(|name| self.providers.get(name))
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<&Arc<P>> {
        self.providers.get(name)
    }

    /// Check if a provider with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.ordered.iter().map(|s| s.as_str()).collect()
    }

    /// Iterate over providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<P>> {
        self.ordered
            .iter()
            .filter_map(move |name| self.providers.get(name))
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<P: Provider + ?Sized> Default for ProviderSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

type Probe = Box<dyn Fn(&dyn ConfigSource) -> DiscoveryResult<bool> + Send + Sync>;
type Build<P> = Box<dyn Fn(&dyn ConfigSource) -> DiscoveryResult<Arc<P>> + Send + Sync>;

/// A provider declared for discovery: a configuration probe plus a
/// constructor, run only when the probe says the provider is configured.
pub struct Candidate<P: ?Sized> {
    label: String,
    probe: Probe,
    build: Build<P>,
}

impl<P: ?Sized> Candidate<P> {
    /// Declare a candidate from raw probe and constructor closures.
    pub fn new<Pr, B>(label: impl Into<String>, probe: Pr, build: B) -> Self
    where
        Pr: Fn(&dyn ConfigSource) -> DiscoveryResult<bool> + Send + Sync + 'static,
        B: Fn(&dyn ConfigSource) -> DiscoveryResult<Arc<P>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            probe: Box::new(probe),
            build: Box::new(build),
        }
    }

    /// Declare a [`Discoverable`] provider type.
    ///
    /// `collaborator` is the raw-fetch (or delivery) collaborator the
    /// provider is built around; a configured provider with no collaborator
    /// wired fails construction. `upcast` turns the concrete provider into
    /// the domain's contract object.
    pub fn of<T>(
        collaborator: Option<Arc<T::Collaborator>>,
        upcast: fn(Arc<T>) -> Arc<P>,
    ) -> Self
    where
        T: Discoverable + 'static,
        T::Collaborator: 'static,
        P: 'static,
    {
        let label = short_type_name::<T>();
        let missing = label.clone();
        Self::new(
            label,
            |config| Ok(T::is_configured(config)),
            move |config| {
                let collaborator = collaborator.clone().ok_or_else(|| {
                    DiscoveryError::InitializationFailed(format!(
                        "no collaborator wired for {missing}"
                    ))
                })?;
                T::from_config(config, collaborator).map(|provider| upcast(Arc::new(provider)))
            },
        )
    }

    /// Label used in discovery logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Probe, then construct if configured.
    ///
    /// `Ok(None)` means the candidate is not configured. Panics in either
    /// stage are caught and reported as [`DiscoveryError::Panicked`].
    fn try_build(&self, config: &dyn ConfigSource) -> DiscoveryResult<Option<Arc<P>>> {
        if !guarded("probe", || (self.probe)(config))? {
            return Ok(None);
        }
        guarded("construct", || (self.build)(config)).map(Some)
    }
}

impl Candidate<dyn AdsProvider> {
    /// Declare an advertising provider type.
    pub fn ads<T>(collaborator: Option<Arc<T::Collaborator>>) -> Self
    where
        T: AdsProvider + Discoverable + 'static,
        T::Collaborator: 'static,
    {
        Self::of::<T>(collaborator, |provider| provider as Arc<dyn AdsProvider>)
    }
}

impl Candidate<dyn AnalyticsProvider> {
    /// Declare a web-analytics provider type.
    pub fn analytics<T>(collaborator: Option<Arc<T::Collaborator>>) -> Self
    where
        T: AnalyticsProvider + Discoverable + 'static,
        T::Collaborator: 'static,
    {
        Self::of::<T>(collaborator, |provider| provider as Arc<dyn AnalyticsProvider>)
    }
}

impl Candidate<dyn FinanceProvider> {
    /// Declare a finance provider type.
    pub fn finance<T>(collaborator: Option<Arc<T::Collaborator>>) -> Self
    where
        T: FinanceProvider + Discoverable + 'static,
        T::Collaborator: 'static,
    {
        Self::of::<T>(collaborator, |provider| provider as Arc<dyn FinanceProvider>)
    }
}

impl Candidate<dyn NotificationProvider> {
    /// Declare a notification provider type.
    pub fn notifications<T>(collaborator: Option<Arc<T::Collaborator>>) -> Self
    where
        T: NotificationProvider + Discoverable + 'static,
        T::Collaborator: 'static,
    {
        Self::of::<T>(collaborator, |provider| provider as Arc<dyn NotificationProvider>)
    }
}

impl<P: ?Sized> fmt::Debug for Candidate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate").field("label", &self.label).finish()
    }
}

fn guarded<T>(stage: &'static str, run: impl FnOnce() -> DiscoveryResult<T>) -> DiscoveryResult<T> {
    catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
        Err(DiscoveryError::Panicked {
            stage,
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn short_type_name<T>() -> String {
    let full = any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

/// A capability domain at the type level.
///
/// Marker types implementing this trait select a domain in
/// [`CapabilityRegistry::get`] and friends, so lookups return the domain's
/// contract object without any runtime downcasting.
pub trait DomainKind: 'static {
    /// The domain's contract object.
    type Provider: Provider + ?Sized;

    /// Runtime key of the domain.
    const DOMAIN: Domain;

    #[doc(hidden)]
    fn candidates(builder: &mut RegistryBuilder) -> &mut Vec<Candidate<Self::Provider>>;

    #[doc(hidden)]
    fn providers(registry: &CapabilityRegistry) -> &ProviderSet<Self::Provider>;
}

/// Advertising domain marker.
#[derive(Debug, Clone, Copy)]
pub struct AdsDomain;

/// Web-analytics domain marker.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsDomain;

/// Finance domain marker.
#[derive(Debug, Clone, Copy)]
pub struct FinanceDomain;

/// Notifications domain marker.
#[derive(Debug, Clone, Copy)]
pub struct NotificationDomain;

impl DomainKind for AdsDomain {
    type Provider = dyn AdsProvider;
    const DOMAIN: Domain = Domain::Advertising;

    fn candidates(builder: &mut RegistryBuilder) -> &mut Vec<Candidate<Self::Provider>> {
        &mut builder.ads
    }

    fn providers(registry: &CapabilityRegistry) -> &ProviderSet<Self::Provider> {
        &registry.ads
    }
}

impl DomainKind for AnalyticsDomain {
    type Provider = dyn AnalyticsProvider;
    const DOMAIN: Domain = Domain::Analytics;

    fn candidates(builder: &mut RegistryBuilder) -> &mut Vec<Candidate<Self::Provider>> {
        &mut builder.analytics
    }

    fn providers(registry: &CapabilityRegistry) -> &ProviderSet<Self::Provider> {
        &registry.analytics
    }
}

impl DomainKind for FinanceDomain {
    type Provider = dyn FinanceProvider;
    const DOMAIN: Domain = Domain::Finance;

    fn candidates(builder: &mut RegistryBuilder) -> &mut Vec<Candidate<Self::Provider>> {
        &mut builder.finance
    }

    fn providers(registry: &CapabilityRegistry) -> &ProviderSet<Self::Provider> {
        &registry.finance
    }
}

impl DomainKind for NotificationDomain {
    type Provider = dyn NotificationProvider;
    const DOMAIN: Domain = Domain::Notifications;

    fn candidates(builder: &mut RegistryBuilder) -> &mut Vec<Candidate<Self::Provider>> {
        &mut builder.notifications
    }

    fn providers(registry: &CapabilityRegistry) -> &ProviderSet<Self::Provider> {
        &registry.notifications
    }
}

/// Declared candidates, not yet discovered.
///
/// # Example
///
/// ```rust
/// use admetrix::{AdsDomain, Domain, RegistryBuilder, StaticConfig};
///
/// let registry = RegistryBuilder::new().discover(&StaticConfig::new());
///
/// assert!(registry.get::<AdsDomain>().is_none());
/// assert!(registry.status()[&Domain::Advertising].is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    ads: Vec<Candidate<dyn AdsProvider>>,
    analytics: Vec<Candidate<dyn AnalyticsProvider>>,
    finance: Vec<Candidate<dyn FinanceProvider>>,
    notifications: Vec<Candidate<dyn NotificationProvider>>,
}

impl RegistryBuilder {
    /// Create a builder with no candidates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate to domain `D`. Declaration order is preference
    /// order.
    pub fn candidate<D: DomainKind>(mut self, candidate: Candidate<D::Provider>) -> Self {
        D::candidates(&mut self).push(candidate);
        self
    }

    /// Run discovery once against `config` and return the ready registry.
    pub fn discover(self, config: &dyn ConfigSource) -> CapabilityRegistry {
        let registry = CapabilityRegistry {
            ads: discover_domain(Domain::Advertising, self.ads, config),
            analytics: discover_domain(Domain::Analytics, self.analytics, config),
            finance: discover_domain(Domain::Finance, self.finance, config),
            notifications: discover_domain(Domain::Notifications, self.notifications, config),
        };

        info!(
            advertising = registry.ads.len(),
            analytics = registry.analytics.len(),
            finance = registry.finance.len(),
            notifications = registry.notifications.len(),
            "Capability discovery complete"
        );
        registry
    }
}

fn discover_domain<P: Provider + ?Sized>(
    domain: Domain,
    candidates: Vec<Candidate<P>>,
    config: &dyn ConfigSource,
) -> ProviderSet<P> {
    let mut set = ProviderSet::new();
    for candidate in candidates {
        let provider = match candidate.try_build(config) {
            Ok(Some(provider)) => provider,
            Ok(None) => {
                debug!(%domain, candidate = candidate.label(), "Provider not configured");
                continue;
            }
            Err(e) => {
                warn!(%domain, candidate = candidate.label(), error = %e, "Skipping provider candidate");
                continue;
            }
        };

        let name = provider.name().to_string();
        match set.register_unique(provider) {
            Ok(()) => info!(%domain, provider = %name, "Registered provider"),
            Err(e) => warn!(%domain, candidate = candidate.label(), error = %e, "Skipping duplicate provider"),
        }
    }
    set
}

/// Discovered providers, grouped by domain.
///
/// Immutable once built; share it behind an `Arc` and call it from any
/// number of tasks.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    ads: ProviderSet<dyn AdsProvider>,
    analytics: ProviderSet<dyn AnalyticsProvider>,
    finance: ProviderSet<dyn FinanceProvider>,
    notifications: ProviderSet<dyn NotificationProvider>,
}

impl CapabilityRegistry {
    /// Start declaring candidates.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The primary provider of domain `D`, if any was discovered.
    pub fn get<D: DomainKind>(&self) -> Option<Arc<D::Provider>> {
        D::providers(self).primary().cloned()
    }

    /// Every provider of domain `D`, in declaration order.
    pub fn get_all<D: DomainKind>(&self) -> Vec<Arc<D::Provider>> {
        D::providers(self).iter().cloned().collect()
    }

    /// A provider of domain `D` by name.
    pub fn get_by_name<D: DomainKind>(&self, name: &str) -> Option<Arc<D::Provider>> {
        D::providers(self).get(name).cloned()
    }

    /// Provider names per domain. Every domain is present, possibly empty.
    pub fn status(&self) -> BTreeMap<Domain, Vec<String>> {
        Domain::ALL
            .iter()
            .map(|domain| (*domain, self.names(*domain)))
            .collect()
    }

    /// Domains with at least one provider.
    pub fn domains(&self) -> Vec<Domain> {
        Domain::ALL
            .iter()
            .copied()
            .filter(|domain| !self.names(*domain).is_empty())
            .collect()
    }

    /// Total number of providers across domains.
    pub fn len(&self) -> usize {
        self.ads.len() + self.analytics.len() + self.finance.len() + self.notifications.len()
    }

    /// Check whether no provider was discovered at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn names(&self, domain: Domain) -> Vec<String> {
        let names = match domain {
            Domain::Advertising => self.ads.names(),
            Domain::Analytics => self.analytics.names(),
            Domain::Finance => self.finance.names(),
            Domain::Notifications => self.notifications.names(),
        };
        names.into_iter().map(str::to_string).collect()
    }
}
