//! Error types for depot-core.

use depot_config::error::{ConfigError, PathError};
use depot_db::DbError;
use depot_provider::ProviderError;
use depot_storage::{StorageError, SymbolError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DepotError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error("Error while {action}")]
    #[diagnostic(code(depot::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Package {id} {version} not found")]
    #[diagnostic(
        code(depot::package_not_found),
        help("Run 'depot package list <id>' to see the published versions")
    )]
    PackageNotFound { id: String, version: String },

    #[error("Background task failed: {0}")]
    #[diagnostic(code(depot::task), help("This is an internal error, please report it"))]
    TaskFailed(String),

    #[error("{0}")]
    #[diagnostic(code(depot::error))]
    Custom(String),
}

impl From<tokio::task::JoinError> for DepotError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, DepotError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, DepotError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            DepotError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
