use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use depot_config::ConfigSnapshot;
use tracing::{debug, trace, warn};

use crate::{
    error::{InspectedValue, ProviderError, Result},
    provider::CapabilityProvider,
    scope::ResolutionContext,
};

/// How long a resolved instance is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// One instance for the whole process.
    Singleton,
    /// One instance per [`Scope`](crate::Scope).
    Scoped,
    /// A new instance on every resolution.
    Transient,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Scoped => write!(f, "scoped"),
            Lifetime::Transient => write!(f, "transient"),
        }
    }
}

/// The ordered providers of one capability.
///
/// Providers are evaluated in registration order and the first one whose
/// predicate matches the configuration wins. Later providers are never
/// evaluated, so a misconfiguration that activates two of them still resolves
/// deterministically to the earlier one.
///
/// Every resolution evaluates the predicates against its snapshot. Cached
/// instances are kept per provider, so a new snapshot selecting another
/// provider gets that provider's instance.
pub struct ProviderSet<T: ?Sized, C: ?Sized> {
    capability: &'static str,
    lifetime: Lifetime,
    providers: Vec<CapabilityProvider<T, C>>,
    /// One slot per provider, same index.
    singletons: Vec<OnceLock<Arc<T>>>,
}

impl<T, C> ProviderSet<T, C>
where
    T: ?Sized + Send + Sync + 'static,
    C: ?Sized + ResolutionContext,
{
    pub fn new(capability: &'static str, lifetime: Lifetime) -> Self {
        Self {
            capability,
            lifetime,
            providers: Vec::new(),
            singletons: Vec::new(),
        }
    }

    pub fn register(&mut self, provider: CapabilityProvider<T, C>) -> &mut Self {
        trace!(
            capability = self.capability,
            provider = provider.name(),
            "registering provider"
        );
        self.providers.push(provider);
        self.singletons.push(OnceLock::new());
        self
    }

    pub fn capability(&self) -> &'static str {
        self.capability
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn providers(&self) -> &[CapabilityProvider<T, C>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn select(&self, config: &ConfigSnapshot) -> Option<(usize, &CapabilityProvider<T, C>)> {
        self.providers
            .iter()
            .enumerate()
            .find(|(_, p)| p.is_active(config))
    }

    /// Name of the provider `config` would select.
    pub fn active_provider(&self, config: &ConfigSnapshot) -> Option<&'static str> {
        self.select(config).map(|(_, provider)| provider.name())
    }

    /// Resolves using the context's own configuration.
    pub fn resolve(&self, ctx: &C) -> Result<Arc<T>> {
        self.resolve_with(ctx.configuration(), ctx)
    }

    /// Selects the active provider for `config` and returns its instance,
    /// honouring the set's [`Lifetime`].
    pub fn resolve_with(&self, config: &ConfigSnapshot, ctx: &C) -> Result<Arc<T>> {
        let Some((index, provider)) = self.select(config) else {
            let err = self.no_active_provider(config);
            warn!(capability = self.capability, "{err}");
            return Err(err);
        };

        let key = (self.capability, provider.name());
        let cached = match self.lifetime {
            Lifetime::Singleton => self.singletons[index].get().cloned(),
            Lifetime::Scoped => ctx.scope().get::<T>(key),
            Lifetime::Transient => None,
        };
        if let Some(instance) = cached {
            return Ok(instance);
        }

        let instance = provider
            .create(ctx)
            .map_err(|source| ProviderError::Construction {
                capability: self.capability,
                provider: provider.name(),
                source,
            })?;

        debug!(
            capability = self.capability,
            provider = provider.name(),
            lifetime = %self.lifetime,
            "resolved capability"
        );

        let instance = match self.lifetime {
            Lifetime::Singleton => self.singletons[index].get_or_init(|| instance).clone(),
            Lifetime::Scoped => ctx.scope().get_or_insert(key, instance),
            Lifetime::Transient => instance,
        };

        Ok(instance)
    }

    /// Fails when two providers claim the same configuration value.
    pub fn check_consistency(&self) -> Result<()> {
        let claims: Vec<_> = self
            .providers
            .iter()
            .filter_map(|p| p.claim().map(|claim| (p.name(), claim)))
            .collect();

        for (i, (first, (key, value))) in claims.iter().enumerate() {
            let duplicate = claims[i + 1..].iter().find(|(_, (k, v))| {
                depot_config::keys::normalize(k) == depot_config::keys::normalize(key)
                    && v.eq_ignore_ascii_case(value)
            });

            if let Some((second, _)) = duplicate {
                return Err(ProviderError::DuplicateClaim {
                    capability: self.capability,
                    key: *key,
                    value: *value,
                    first: *first,
                    second: *second,
                });
            }
        }

        Ok(())
    }

    fn no_active_provider(&self, config: &ConfigSnapshot) -> ProviderError {
        let mut keys: Vec<&'static str> = Vec::new();
        for key in self.providers.iter().flat_map(|p| p.inspects()) {
            if !keys.contains(key) {
                keys.push(*key);
            }
        }

        ProviderError::NoActiveProvider {
            capability: self.capability,
            inspected: keys
                .into_iter()
                .map(|key| {
                    InspectedValue {
                        key: key.to_string(),
                        value: config.get(key).map(str::to_string),
                    }
                })
                .collect(),
            registered: self.providers.iter().map(CapabilityProvider::name).collect(),
        }
    }
}

impl<T: ?Sized, C: ?Sized> fmt::Debug for ProviderSet<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSet")
            .field("capability", &self.capability)
            .field("lifetime", &self.lifetime)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}
