use std::{fmt, sync::Arc};

use depot_config::ConfigSnapshot;

use crate::error::BoxError;

type Predicate = dyn Fn(&ConfigSnapshot) -> bool + Send + Sync;
type Factory<T, C> = dyn Fn(&C) -> Result<Arc<T>, BoxError> + Send + Sync;

/// One backend implementation of a capability `T`, constructed from a
/// resolution context `C`, together with the predicate that decides when it
/// is the active one.
pub struct CapabilityProvider<T: ?Sized, C: ?Sized> {
    name: &'static str,
    predicate: Box<Predicate>,
    factory: Box<Factory<T, C>>,
    inspects: Vec<&'static str>,
    claim: Option<(&'static str, &'static str)>,
}

impl<T: ?Sized, C: ?Sized> CapabilityProvider<T, C> {
    /// A provider with an arbitrary activation predicate.
    ///
    /// Use [`inspecting`](Self::inspecting) to declare the keys the predicate
    /// reads so they show up when no provider is active.
    pub fn new<P, F>(name: &'static str, predicate: P, factory: F) -> Self
    where
        P: Fn(&ConfigSnapshot) -> bool + Send + Sync + 'static,
        F: Fn(&C) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        Self {
            name,
            predicate: Box::new(predicate),
            factory: Box::new(factory),
            inspects: Vec::new(),
            claim: None,
        }
    }

    /// A provider active when `key` equals `literal` (ignoring ASCII case).
    ///
    /// ```
    /// use std::sync::Arc;
    /// use depot_config::ConfigSnapshot;
    /// use depot_provider::CapabilityProvider;
    ///
    /// let provider: CapabilityProvider<str, ()> =
    ///     CapabilityProvider::when("Memory", "Storage:Type", "Memory", |_: &()| {
    ///         Ok(Arc::from("memory"))
    ///     });
    ///
    /// let config = ConfigSnapshot::from_pairs([("Storage:Type", "memory")]);
    /// assert!(provider.is_active(&config));
    /// assert_eq!(provider.claim(), Some(("Storage:Type", "Memory")));
    /// ```
    pub fn when<F>(name: &'static str, key: &'static str, literal: &'static str, factory: F) -> Self
    where
        F: Fn(&C) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        let mut provider = Self::new(
            name,
            move |config: &ConfigSnapshot| config.is(key, literal),
            factory,
        )
        .inspecting(key);
        provider.claim = Some((key, literal));
        provider
    }

    pub fn inspecting(mut self, key: &'static str) -> Self {
        if !self.inspects.contains(&key) {
            self.inspects.push(key);
        }
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Configuration keys read by the activation predicate.
    pub fn inspects(&self) -> &[&'static str] {
        &self.inspects
    }

    /// The `(key, literal)` pair this provider activates on, if it was built
    /// with [`when`](Self::when).
    pub fn claim(&self) -> Option<(&'static str, &'static str)> {
        self.claim
    }

    pub fn is_active(&self, config: &ConfigSnapshot) -> bool {
        (self.predicate)(config)
    }

    pub(crate) fn create(&self, ctx: &C) -> Result<Arc<T>, BoxError> {
        (self.factory)(ctx)
    }
}

impl<T: ?Sized, C: ?Sized> fmt::Debug for CapabilityProvider<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProvider")
            .field("name", &self.name)
            .field("inspects", &self.inspects)
            .field("claim", &self.claim)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &'static str) -> CapabilityProvider<str, ()> {
        CapabilityProvider::when(name, "Storage:Type", name, move |_: &()| Ok(Arc::from(name)))
    }

    #[test]
    fn test_when_matches_literal() {
        let memory = provider("Memory");

        assert!(memory.is_active(&ConfigSnapshot::from_pairs([("Storage:Type", "Memory")])));
        assert!(!memory.is_active(&ConfigSnapshot::from_pairs([("Storage:Type", "FileSystem")])));
        assert!(!memory.is_active(&ConfigSnapshot::new()));
        assert_eq!(memory.inspects(), &["Storage:Type"]);
    }

    #[test]
    fn test_custom_predicate() {
        let provider: CapabilityProvider<str, ()> = CapabilityProvider::new(
            "Fallback",
            |config: &ConfigSnapshot| config.get("Search:Type").is_none(),
            |_: &()| Ok(Arc::from("fallback")),
        )
        .inspecting("Search:Type")
        .inspecting("Search:Type");

        assert!(provider.is_active(&ConfigSnapshot::new()));
        assert_eq!(provider.claim(), None);
        assert_eq!(provider.inspects().len(), 1);
    }

    #[test]
    fn test_create_invokes_factory() {
        let memory = provider("Memory");
        assert_eq!(&*memory.create(&()).unwrap(), "Memory");
    }
}
