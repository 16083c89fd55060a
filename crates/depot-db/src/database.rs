use semver::Version;

use crate::{
    error::Result,
    package::{NewPackage, Package, PackageAddResult},
};

/// Persistence of package metadata.
///
/// Package ids compare case-insensitively. Versions compare by their
/// normalized form, ignoring build metadata.
pub trait PackageDatabase: Send + Sync {
    fn add(&self, package: &NewPackage) -> Result<PackageAddResult>;

    /// Whether the package exists, optionally at a specific version.
    fn exists(&self, id: &str, version: Option<&Version>) -> Result<bool>;

    /// All versions of a package, lowest version first.
    fn find(&self, id: &str, include_unlisted: bool) -> Result<Vec<Package>>;

    fn find_one(
        &self,
        id: &str,
        version: &Version,
        include_unlisted: bool,
    ) -> Result<Option<Package>>;

    /// Hides a version from search. Returns false when it does not exist.
    fn unlist(&self, id: &str, version: &Version) -> Result<bool>;

    fn relist(&self, id: &str, version: &Version) -> Result<bool>;

    /// Fails with [`DbError::NotFound`](crate::DbError::NotFound) when the
    /// version does not exist.
    fn add_download(&self, id: &str, version: &Version) -> Result<()>;

    /// Removes a version permanently. Returns false when it does not exist.
    fn hard_delete(&self, id: &str, version: &Version) -> Result<bool>;

    /// Package versions whose id contains `query` (ignoring case), ordered by
    /// id then publication order. Returns the total number of matches and the
    /// requested page.
    fn search(
        &self,
        query: Option<&str>,
        include_unlisted: bool,
        skip: usize,
        take: usize,
    ) -> Result<(usize, Vec<Package>)>;

    /// Brings the schema up to date.
    fn migrate(&self) -> Result<()>;
}
