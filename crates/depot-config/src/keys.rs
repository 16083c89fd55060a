//! Well-known configuration keys.
//!
//! Keys are `:`-separated section paths. Lookups through
//! [`ConfigSnapshot`](crate::ConfigSnapshot) ignore ASCII case and
//! underscores, so `Database:Type`, `database:type` and the environment
//! variable `DEPOT_DATABASE__TYPE` all address the same value.

pub const ROOT_PATH: &str = "RootPath";
pub const RUN_MIGRATIONS_AT_STARTUP: &str = "RunMigrationsAtStartup";

pub const DATABASE_TYPE: &str = "Database:Type";
pub const DATABASE_PATH: &str = "Database:Path";

pub const STORAGE_TYPE: &str = "Storage:Type";
pub const STORAGE_PATH: &str = "Storage:Path";

pub const SEARCH_TYPE: &str = "Search:Type";

/// Separator between sections of a key.
pub const SEPARATOR: char = ':';

/// Environment variables starting with this prefix override configuration.
pub const ENV_PREFIX: &str = "DEPOT_";

/// Environment variables that configure the loader itself and never become
/// configuration keys.
pub const RESERVED_ENV: &[&str] = &["DEPOT_CONFIG", "DEPOT_ROOT", "DEPOT_SECRETS_DIR", "DEPOT_LOG"];

/// Normalizes a key for comparison: ASCII lower-case, underscores dropped.
pub fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Converts an environment variable name (without prefix) into a key:
/// `STORAGE__TYPE` becomes `storage:type`.
pub fn from_env_name(name: &str) -> String {
    name.split("__")
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(":")
}
