use std::sync::Arc;

use async_trait::async_trait;
use depot_db::{Package, PackageDatabase};
use tracing::debug;

use crate::DepotResult;

pub const DEFAULT_TAKE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Substring of the package id. `None` matches every package.
    pub query: Option<String>,
    pub skip: usize,
    pub take: usize,
    pub include_unlisted: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            skip: 0,
            take: DEFAULT_TAKE,
            include_unlisted: false,
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn page(mut self, skip: usize, take: usize) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    /// Matches before paging.
    pub total_hits: usize,
    pub data: Vec<Package>,
}

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> DepotResult<SearchResponse>;
}

/// Searches the package database of the current scope.
pub struct DatabaseSearchService {
    database: Arc<dyn PackageDatabase>,
}

impl DatabaseSearchService {
    pub fn new(database: Arc<dyn PackageDatabase>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl SearchService for DatabaseSearchService {
    async fn search(&self, request: &SearchRequest) -> DepotResult<SearchResponse> {
        let database = self.database.clone();
        let request = request.clone();

        let (total_hits, data) = tokio::task::spawn_blocking(move || {
            database.search(
                request.query.as_deref().filter(|q| !q.trim().is_empty()),
                request.include_unlisted,
                request.skip,
                request.take,
            )
        })
        .await??;

        debug!(total_hits, returned = data.len(), "database search");
        Ok(SearchResponse { total_hits, data })
    }
}

/// Search for deployments without an index: nothing ever matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSearchService;

#[async_trait]
impl SearchService for NullSearchService {
    async fn search(&self, _request: &SearchRequest) -> DepotResult<SearchResponse> {
        Ok(SearchResponse::default())
    }
}

#[cfg(test)]
mod tests {
    use depot_db::{MemoryPackageDatabase, MemoryPackageStore, NewPackage};
    use semver::Version;

    use super::*;

    fn database() -> Arc<dyn PackageDatabase> {
        let db = MemoryPackageDatabase::new(Arc::new(MemoryPackageStore::new()));
        for (id, version) in [("Serilog", "2.0.0"), ("Serilog.Sinks.File", "5.0.0"), ("Dapper", "2.1.0")] {
            db.add(&NewPackage::new(id, Version::parse(version).unwrap()))
                .unwrap();
        }
        Arc::new(db)
    }

    #[tokio::test]
    async fn test_database_search_filters_by_id() {
        let search = DatabaseSearchService::new(database());

        let response = search.search(&SearchRequest::new("serilog")).await.unwrap();
        assert_eq!(response.total_hits, 2);
        let ids: Vec<_> = response.data.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["Serilog", "Serilog.Sinks.File"]);
    }

    #[tokio::test]
    async fn test_database_search_blank_query_matches_all() {
        let search = DatabaseSearchService::new(database());

        let response = search
            .search(&SearchRequest::new("  ").page(1, 1))
            .await
            .unwrap();
        assert_eq!(response.total_hits, 3);
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].id, "Serilog");
    }

    #[tokio::test]
    async fn test_null_search_is_empty() {
        let response = NullSearchService
            .search(&SearchRequest::default())
            .await
            .unwrap();
        assert_eq!(response.total_hits, 0);
        assert!(response.data.is_empty());
    }
}
