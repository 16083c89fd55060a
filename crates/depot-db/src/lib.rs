//! Package metadata persistence.
//!
//! [`PackageDatabase`] is the contract every backend implements. The SQLite
//! backend is compiled in with the `sqlite` feature; the in-memory backend is
//! always available.

pub mod database;
pub mod error;
pub mod memory;
pub mod package;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use database::PackageDatabase;
pub use error::{DbError, Result};
pub use memory::{MemoryPackageDatabase, MemoryPackageStore};
pub use package::{normalize_id, parse_version, NewPackage, Package, PackageAddResult};
#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePackageDatabase;
