use std::sync::{Arc, RwLock};

use depot_config::{keys, ConfigSnapshot, ConfigSource};
use depot_db::PackageDatabase;
use depot_provider::{ProviderError, ResolutionContext, Scope};
use depot_storage::{StorageService, SymbolStorageService};
use tracing::debug;

use crate::{
    capabilities::{Capabilities, CapabilitySummary},
    search::SearchService,
    DepotResult,
};

/// Capabilities plus the configuration they resolve against.
///
/// The context is shared by every unit of work. Each unit begins its own
/// [`DepotScope`], which captures the snapshot current at that moment.
pub struct DepotContext {
    capabilities: Arc<Capabilities>,
    config: RwLock<Arc<ConfigSnapshot>>,
}

/// Outcome of [`DepotContext::validate_startup`].
#[derive(Debug, Clone)]
pub struct StartupReport {
    pub providers: Vec<CapabilitySummary>,
    pub migrated: bool,
}

impl DepotContext {
    pub fn new(capabilities: Capabilities, config: Arc<ConfigSnapshot>) -> Self {
        Self {
            capabilities: Arc::new(capabilities),
            config: RwLock::new(config),
        }
    }

    /// Every compiled-in backend, configured from `source`.
    pub fn load(source: &ConfigSource) -> DepotResult<Self> {
        let config = source.load()?;
        Ok(Self::new(Capabilities::default_deployment(), config))
    }

    pub fn configuration(&self) -> Arc<ConfigSnapshot> {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn capabilities(&self) -> &Arc<Capabilities> {
        &self.capabilities
    }

    /// Replaces the snapshot seen by scopes begun from now on.
    ///
    /// Providers are selected again against the new snapshot. A singleton
    /// already built by a provider is reused when that provider stays active.
    pub fn reload(&self, config: Arc<ConfigSnapshot>) {
        let mut current = match self.config.write() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = config;
        debug!("configuration reloaded");
    }

    pub fn begin_scope(&self) -> DepotScope {
        DepotScope {
            capabilities: self.capabilities.clone(),
            config: self.configuration(),
            scope: Scope::new(),
        }
    }

    /// Checks the provider sets, resolves every capability once and applies
    /// database migrations when `RunMigrationsAtStartup` allows it.
    pub fn validate_startup(&self) -> DepotResult<StartupReport> {
        self.capabilities.validate()?;

        let scope = self.begin_scope();
        scope.storage()?;
        let database = scope.database()?;
        scope.search()?;

        let providers = self.capabilities.summary(scope.configuration());
        for summary in &providers {
            debug!(
                capability = summary.capability,
                provider = summary.active.unwrap_or("none"),
                lifetime = %summary.lifetime,
                "capability ready"
            );
        }

        let migrate = scope
            .configuration()
            .get_bool(keys::RUN_MIGRATIONS_AT_STARTUP)?
            .unwrap_or(true);
        if migrate {
            database.migrate()?;
            debug!("database migrations applied");
        } else {
            debug!("skipping database migrations");
        }

        Ok(StartupReport {
            providers,
            migrated: migrate,
        })
    }
}

/// One unit of work. Scoped instances live as long as the scope.
pub struct DepotScope {
    capabilities: Arc<Capabilities>,
    config: Arc<ConfigSnapshot>,
    scope: Scope,
}

impl ResolutionContext for DepotScope {
    fn configuration(&self) -> &ConfigSnapshot {
        &self.config
    }

    fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl DepotScope {
    pub fn id(&self) -> u64 {
        self.scope.id()
    }

    pub fn storage(&self) -> Result<Arc<dyn StorageService>, ProviderError> {
        self.capabilities.storage.resolve(self)
    }

    pub fn database(&self) -> Result<Arc<dyn PackageDatabase>, ProviderError> {
        self.capabilities.database.resolve(self)
    }

    pub fn search(&self) -> Result<Arc<dyn SearchService>, ProviderError> {
        self.capabilities.search.resolve(self)
    }

    /// Symbol storage over the active storage backend.
    pub fn symbols(&self) -> Result<SymbolStorageService, ProviderError> {
        Ok(SymbolStorageService::new(self.storage()?))
    }
}
