use std::sync::{Arc, Mutex, MutexGuard};

use semver::Version;
use tracing::debug;

use crate::{
    database::PackageDatabase,
    error::{DbError, Result},
    package::{normalize_id, same_id, same_version, NewPackage, Package, PackageAddResult},
};

/// Process-local package records, in publication order.
#[derive(Debug, Default)]
pub struct MemoryPackageStore {
    packages: Mutex<Vec<Package>>,
}

impl MemoryPackageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Package>>> {
        self.packages.lock().map_err(|_| DbError::PoisonError)
    }
}

/// A handle over a shared [`MemoryPackageStore`].
#[derive(Debug, Clone)]
pub struct MemoryPackageDatabase {
    store: Arc<MemoryPackageStore>,
}

impl MemoryPackageDatabase {
    pub fn new(store: Arc<MemoryPackageStore>) -> Self {
        Self { store }
    }

    fn update<F>(&self, id: &str, version: &Version, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Package),
    {
        let mut packages = self.store.lock()?;
        match packages.iter_mut().find(|p| p.matches(id, version)) {
            Some(package) => {
                f(package);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl PackageDatabase for MemoryPackageDatabase {
    fn add(&self, package: &NewPackage) -> Result<PackageAddResult> {
        let mut packages = self.store.lock()?;
        if packages.iter().any(|p| p.matches(&package.id, &package.version)) {
            return Ok(PackageAddResult::PackageAlreadyExists);
        }

        packages.push(Package {
            id: package.id.clone(),
            version: package.version.clone(),
            listed: package.listed,
            downloads: 0,
            published: package.published,
        });
        debug!(id = %package.id, version = %package.version, "added package");

        Ok(PackageAddResult::Success)
    }

    fn exists(&self, id: &str, version: Option<&Version>) -> Result<bool> {
        let packages = self.store.lock()?;
        Ok(packages.iter().any(|p| {
            same_id(&p.id, id) && version.is_none_or(|v| same_version(&p.version, v))
        }))
    }

    fn find(&self, id: &str, include_unlisted: bool) -> Result<Vec<Package>> {
        let packages = self.store.lock()?;
        let mut found: Vec<Package> = packages
            .iter()
            .filter(|p| same_id(&p.id, id) && (include_unlisted || p.listed))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.version.cmp_precedence(&b.version));
        Ok(found)
    }

    fn find_one(
        &self,
        id: &str,
        version: &Version,
        include_unlisted: bool,
    ) -> Result<Option<Package>> {
        let packages = self.store.lock()?;
        Ok(packages
            .iter()
            .find(|p| p.matches(id, version) && (include_unlisted || p.listed))
            .cloned())
    }

    fn unlist(&self, id: &str, version: &Version) -> Result<bool> {
        self.update(id, version, |p| p.listed = false)
    }

    fn relist(&self, id: &str, version: &Version) -> Result<bool> {
        self.update(id, version, |p| p.listed = true)
    }

    fn add_download(&self, id: &str, version: &Version) -> Result<()> {
        if self.update(id, version, |p| p.downloads += 1)? {
            Ok(())
        } else {
            Err(DbError::NotFound(format!("{id} {version}")))
        }
    }

    fn hard_delete(&self, id: &str, version: &Version) -> Result<bool> {
        let mut packages = self.store.lock()?;
        let before = packages.len();
        packages.retain(|p| !p.matches(id, version));
        Ok(packages.len() != before)
    }

    fn search(
        &self,
        query: Option<&str>,
        include_unlisted: bool,
        skip: usize,
        take: usize,
    ) -> Result<(usize, Vec<Package>)> {
        let query = query.map(normalize_id);
        let packages = self.store.lock()?;

        let mut hits: Vec<&Package> = packages
            .iter()
            .filter(|p| include_unlisted || p.listed)
            .filter(|p| {
                query
                    .as_deref()
                    .is_none_or(|q| normalize_id(&p.id).contains(q))
            })
            .collect();
        // Stable, so equal ids keep publication order.
        hits.sort_by_key(|p| normalize_id(&p.id));

        let total = hits.len();
        let page = hits.into_iter().skip(skip).take(take).cloned().collect();
        Ok((total, page))
    }

    fn migrate(&self) -> Result<()> {
        Ok(())
    }
}
