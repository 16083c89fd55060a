//! The provider sets of every capability, and the backends that can be
//! registered into them.

use std::{path::PathBuf, sync::Arc};

use depot_config::{error::PathError, keys, path::resolve_path, ConfigSnapshot};
use depot_db::{MemoryPackageDatabase, MemoryPackageStore, PackageDatabase};
use depot_provider::{
    CapabilityProvider, Lifetime, ProviderError, ProviderSet, ResolutionContext,
};
use depot_storage::{FileSystemStorageService, MemoryStorageService, StorageService};

use crate::{
    context::DepotScope,
    search::{DatabaseSearchService, NullSearchService, SearchService},
};

pub const STORAGE: &str = "storage";
pub const DATABASE: &str = "database";
pub const SEARCH: &str = "search";

const DEFAULT_STORAGE_PATH: &str = "$DEPOT_ROOT/storage";
#[cfg(feature = "sqlite")]
const DEFAULT_DATABASE_PATH: &str = "$DEPOT_ROOT/db/depot.db";

pub type StorageProvider = CapabilityProvider<dyn StorageService, DepotScope>;
pub type DatabaseProvider = CapabilityProvider<dyn PackageDatabase, DepotScope>;
pub type SearchProvider = CapabilityProvider<dyn SearchService, DepotScope>;

/// One provider set per capability, built once at start-up.
#[derive(Debug)]
pub struct Capabilities {
    pub storage: ProviderSet<dyn StorageService, DepotScope>,
    pub database: ProviderSet<dyn PackageDatabase, DepotScope>,
    pub search: ProviderSet<dyn SearchService, DepotScope>,
}

/// What `depot providers` shows for one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySummary {
    pub capability: &'static str,
    pub lifetime: Lifetime,
    pub providers: Vec<&'static str>,
    pub active: Option<&'static str>,
}

impl Capabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder {
            inner: Capabilities {
                storage: ProviderSet::new(STORAGE, Lifetime::Singleton),
                database: ProviderSet::new(DATABASE, Lifetime::Scoped),
                search: ProviderSet::new(SEARCH, Lifetime::Transient),
            },
        }
    }

    /// Every backend compiled into this build.
    pub fn default_deployment() -> Self {
        let builder = Self::builder().add_file_storage().add_memory_storage();
        #[cfg(feature = "sqlite")]
        let builder = builder.add_sqlite_database();
        builder
            .add_memory_database()
            .add_database_search()
            .add_null_search()
            .build()
    }

    /// Fails when two providers of a capability claim the same value.
    pub fn validate(&self) -> Result<(), ProviderError> {
        self.storage.check_consistency()?;
        self.database.check_consistency()?;
        self.search.check_consistency()?;
        Ok(())
    }

    pub fn summary(&self, config: &ConfigSnapshot) -> Vec<CapabilitySummary> {
        fn summarize<T: ?Sized + Send + Sync + 'static>(
            set: &ProviderSet<T, DepotScope>,
            config: &ConfigSnapshot,
        ) -> CapabilitySummary {
            CapabilitySummary {
                capability: set.capability(),
                lifetime: set.lifetime(),
                providers: set.providers().iter().map(|p| p.name()).collect(),
                active: set.active_provider(config),
            }
        }

        vec![
            summarize(&self.storage, config),
            summarize(&self.database, config),
            summarize(&self.search, config),
        ]
    }
}

fn configured_path(
    config: &ConfigSnapshot,
    key: &str,
    default: &str,
) -> Result<PathBuf, PathError> {
    resolve_path(config.get(key).unwrap_or(default))
}

pub struct CapabilitiesBuilder {
    inner: Capabilities,
}

impl CapabilitiesBuilder {
    /// `Storage:Type = FileSystem`, rooted at `Storage:Path`.
    pub fn add_file_storage(self) -> Self {
        let provider = CapabilityProvider::when(
            "FileSystem",
            keys::STORAGE_TYPE,
            "FileSystem",
            |scope: &DepotScope| {
                let root = configured_path(
                    scope.configuration(),
                    keys::STORAGE_PATH,
                    DEFAULT_STORAGE_PATH,
                )?;
                Ok(Arc::new(FileSystemStorageService::new(root)) as Arc<dyn StorageService>)
            },
        );
        self.with_storage(provider.inspecting(keys::STORAGE_PATH))
    }

    /// `Storage:Type = Memory`.
    pub fn add_memory_storage(self) -> Self {
        self.with_storage(CapabilityProvider::when(
            "Memory",
            keys::STORAGE_TYPE,
            "Memory",
            |_: &DepotScope| Ok(Arc::new(MemoryStorageService::new()) as Arc<dyn StorageService>),
        ))
    }

    /// `Database:Type = Sqlite`, stored at `Database:Path`.
    #[cfg(feature = "sqlite")]
    pub fn add_sqlite_database(self) -> Self {
        let provider = CapabilityProvider::when(
            "Sqlite",
            keys::DATABASE_TYPE,
            "Sqlite",
            |scope: &DepotScope| {
                let path = configured_path(
                    scope.configuration(),
                    keys::DATABASE_PATH,
                    DEFAULT_DATABASE_PATH,
                )?;
                let database = depot_db::SqlitePackageDatabase::open(path)?;
                Ok(Arc::new(database) as Arc<dyn PackageDatabase>)
            },
        );
        self.with_database(provider.inspecting(keys::DATABASE_PATH))
    }

    /// `Database:Type = Memory`. Every scope gets its own handle over one
    /// store shared by the whole process.
    pub fn add_memory_database(self) -> Self {
        let store = Arc::new(MemoryPackageStore::new());
        self.with_database(CapabilityProvider::when(
            "Memory",
            keys::DATABASE_TYPE,
            "Memory",
            move |_: &DepotScope| {
                let database = MemoryPackageDatabase::new(store.clone());
                Ok(Arc::new(database) as Arc<dyn PackageDatabase>)
            },
        ))
    }

    /// `Search:Type = Database`, over the scope's package database.
    pub fn add_database_search(self) -> Self {
        self.with_search(CapabilityProvider::when(
            "Database",
            keys::SEARCH_TYPE,
            "Database",
            |scope: &DepotScope| {
                let database = scope.database()?;
                Ok(Arc::new(DatabaseSearchService::new(database)) as Arc<dyn SearchService>)
            },
        ))
    }

    /// `Search:Type = Null`.
    pub fn add_null_search(self) -> Self {
        self.with_search(CapabilityProvider::when(
            "Null",
            keys::SEARCH_TYPE,
            "Null",
            |_: &DepotScope| Ok(Arc::new(NullSearchService) as Arc<dyn SearchService>),
        ))
    }

    pub fn with_storage(mut self, provider: StorageProvider) -> Self {
        self.inner.storage.register(provider);
        self
    }

    pub fn with_database(mut self, provider: DatabaseProvider) -> Self {
        self.inner.database.register(provider);
        self
    }

    pub fn with_search(mut self, provider: SearchProvider) -> Self {
        self.inner.search.register(provider);
        self
    }

    pub fn build(self) -> Capabilities {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_deployment_is_consistent() {
        let capabilities = Capabilities::default_deployment();
        assert!(capabilities.validate().is_ok());

        let names: Vec<_> = capabilities
            .storage
            .providers()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["FileSystem", "Memory"]);
        assert_eq!(capabilities.search.len(), 2);
    }

    #[test]
    fn test_summary_reports_active_providers() {
        let capabilities = Capabilities::default_deployment();
        let config = ConfigSnapshot::from_pairs([
            (keys::STORAGE_TYPE, "memory"),
            (keys::DATABASE_TYPE, "Memory"),
            (keys::SEARCH_TYPE, "Elastic"),
        ]);

        let summary = capabilities.summary(&config);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].capability, STORAGE);
        assert_eq!(summary[0].lifetime, Lifetime::Singleton);
        assert_eq!(summary[0].active, Some("Memory"));
        assert_eq!(summary[1].lifetime, Lifetime::Scoped);
        assert_eq!(summary[1].active, Some("Memory"));
        assert_eq!(summary[2].lifetime, Lifetime::Transient);
        assert_eq!(summary[2].active, None);
    }

    #[test]
    fn test_duplicate_backend_fails_validation() {
        let capabilities = Capabilities::builder()
            .add_memory_storage()
            .add_memory_storage()
            .build();

        assert!(matches!(
            capabilities.validate(),
            Err(ProviderError::DuplicateClaim { capability: STORAGE, .. })
        ));
    }
}
