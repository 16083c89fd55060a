use std::io;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum StorageError {
    #[error("Object not found: {path}")]
    #[diagnostic(code(depot_storage::not_found))]
    NotFound { path: String },

    #[error("Invalid storage path '{path}': {reason}")]
    #[diagnostic(
        code(depot_storage::invalid_path),
        help("Storage paths are relative, '/'-separated and may not contain '.' or '..' segments")
    )]
    InvalidPath { path: String, reason: &'static str },

    #[error("Storage backend unavailable while accessing '{path}': {source}")]
    #[diagnostic(
        code(depot_storage::unavailable),
        help("Check that the storage location exists and is writable")
    )]
    Unavailable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Write to '{path}' was cancelled")]
    #[diagnostic(code(depot_storage::cancelled))]
    Cancelled { path: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub(crate) fn unavailable(path: &str, source: io::Error) -> Self {
        StorageError::Unavailable {
            path: path.to_string(),
            source,
        }
    }

    /// Maps an IO error for `path`, keeping not-found distinct.
    pub(crate) fn from_io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound {
                path: path.to_string(),
            }
        } else {
            Self::unavailable(path, source)
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
