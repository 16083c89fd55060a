//! Error types for depot-db.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(depot_db::connection),
        help("Check that Database:Path points to a writable location")
    )]
    ConnectionError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(
        code(depot_db::query),
        help("Run 'depot migrate' if the schema is out of date")
    )]
    QueryError(String),

    #[error("Database migration failed: {0}")]
    #[diagnostic(
        code(depot_db::migration),
        help("The database schema may be corrupted. Try restoring from a backup.")
    )]
    MigrationError(String),

    #[error("Package not found: {0}")]
    #[diagnostic(code(depot_db::not_found))]
    NotFound(String),

    #[error("Invalid package version '{version}': {source}")]
    #[diagnostic(
        code(depot_db::invalid_version),
        help("Package versions must be valid semantic versions, e.g. 1.2.3 or 2.0.0-beta.1")
    )]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid timestamp '{0}' in package record")]
    #[diagnostic(code(depot_db::invalid_timestamp))]
    InvalidTimestamp(String),

    #[error("Database lock poisoned")]
    #[diagnostic(
        code(depot_db::poison),
        help("A previous operation panicked while holding the connection")
    )]
    PoisonError,

    #[error("IO error: {0}")]
    #[diagnostic(code(depot_db::io), help("Check file permissions and disk space"))]
    IoError(#[from] std::io::Error),
}

#[cfg(feature = "sqlite")]
impl From<diesel::result::Error> for DbError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => DbError::NotFound("Record not found".to_string()),
            diesel::result::Error::DatabaseError(_, info) => {
                DbError::QueryError(info.message().to_string())
            }
            other => DbError::QueryError(other.to_string()),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<diesel::result::ConnectionError> for DbError {
    fn from(err: diesel::result::ConnectionError) -> Self {
        DbError::ConnectionError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
