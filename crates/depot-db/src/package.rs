use chrono::{DateTime, Utc};
use semver::{BuildMetadata, Version};

use crate::error::{DbError, Result};

/// Outcome of [`PackageDatabase::add`](crate::PackageDatabase::add).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAddResult {
    Success,
    PackageAlreadyExists,
}

/// One published version of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: String,
    pub version: Version,
    pub listed: bool,
    pub downloads: i64,
    pub published: DateTime<Utc>,
}

impl Package {
    pub(crate) fn matches(&self, id: &str, version: &Version) -> bool {
        same_id(&self.id, id) && same_version(&self.version, version)
    }
}

/// A package version about to be published.
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub id: String,
    pub version: Version,
    pub listed: bool,
    pub published: DateTime<Utc>,
}

impl NewPackage {
    /// A listed package published now.
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            listed: true,
            published: Utc::now(),
        }
    }

    pub fn unlisted(mut self) -> Self {
        self.listed = false;
        self
    }
}

/// Parses a semantic version, reporting the offending text on failure.
pub fn parse_version(version: &str) -> Result<Version> {
    Version::parse(version.trim()).map_err(|source| {
        DbError::InvalidVersion {
            version: version.to_string(),
            source,
        }
    })
}

/// Version string used for storage and comparison. Build metadata does not
/// distinguish versions.
pub fn normalize_version(version: &Version) -> String {
    let mut normalized = version.clone();
    normalized.build = BuildMetadata::EMPTY;
    normalized.to_string()
}

/// Ids are stored as given and compared lower-cased.
pub fn normalize_id(id: &str) -> String {
    id.to_lowercase()
}

pub(crate) fn same_id(a: &str, b: &str) -> bool {
    a == b || normalize_id(a) == normalize_id(b)
}

pub(crate) fn same_version(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor && a.patch == b.patch && a.pre == b.pre
}
