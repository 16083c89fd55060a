//! Portable PDB storage.
//!
//! Symbol files are addressed by their file name and debug key:
//! `symbols/{file name}/{signature}`, where the signature is the first 32
//! characters of the key followed by `ffffffff`, all lower-cased.

use std::{ffi::OsStr, fmt, path::Path, sync::Arc};

use miette::Diagnostic;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    error::StorageError,
    service::{ContentStream, StoragePutResult, StorageService},
};

pub const SYMBOLS_PREFIX: &str = "symbols";
pub const PDB_CONTENT_TYPE: &str = "binary/octet-stream";

/// Lexical root file names are composed onto; never touched on disk.
const ADDRESS_ROOT: &str = "/depot/symbols";
const KEY_LENGTH: usize = 32;
const SIGNATURE_SUFFIX: &str = "ffffffff";

/// Storage path of one portable PDB.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolKey(String);

impl SymbolKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SymbolKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the storage path for `filename` and debug `key`.
///
/// Returns `None` when the file name is not a single plain path component or
/// the key is shorter than 32 characters or contains anything but ASCII
/// letters and digits.
///
/// ```
/// use depot_storage::derive_symbol_key;
///
/// let key = derive_symbol_key("App.pdb", "0123456789ABCDEF0123456789ABCDEF").unwrap();
/// assert_eq!(key.as_str(), "symbols/app.pdb/0123456789abcdef0123456789abcdefffffffff");
///
/// assert!(derive_symbol_key("../app.pdb", "0123456789ABCDEF0123456789ABCDEF").is_none());
/// ```
pub fn derive_symbol_key(filename: &str, key: &str) -> Option<SymbolKey> {
    if !is_plain_file_name(filename) {
        error!(filename, "rejected symbol file name outside the symbols root");
        return None;
    }

    if key.len() < KEY_LENGTH || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        error!(key, "rejected malformed symbol key");
        return None;
    }

    let signature = format!("{}{SIGNATURE_SUFFIX}", &key[..KEY_LENGTH]);
    Some(SymbolKey(format!(
        "{SYMBOLS_PREFIX}/{}/{}",
        filename.to_lowercase(),
        signature.to_ascii_lowercase()
    )))
}

fn is_plain_file_name(filename: &str) -> bool {
    if filename.is_empty() || filename.contains('\\') {
        return false;
    }

    let root = Path::new(ADDRESS_ROOT);
    let composed = root.join(filename);
    composed.parent() == Some(root) && composed.file_name() == Some(OsStr::new(filename))
}

#[derive(Error, Diagnostic, Debug)]
pub enum SymbolError {
    #[error("Invalid symbol address for file '{filename}' and key '{key}'")]
    #[diagnostic(
        code(depot_storage::symbols::invalid_address),
        help("The file name must be a single path component and the key at least 32 letters or digits")
    )]
    InvalidAddress { filename: String, key: String },

    #[error("Symbol file already exists at '{path}'")]
    #[diagnostic(
        code(depot_storage::symbols::conflict),
        help("Symbol files are immutable once published")
    )]
    Conflict { path: SymbolKey },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),
}

/// Stores and retrieves portable PDB files through a [`StorageService`].
#[derive(Clone)]
pub struct SymbolStorageService {
    storage: Arc<dyn StorageService>,
}

impl SymbolStorageService {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    pub async fn save_portable_pdb_content(
        &self,
        filename: &str,
        key: &str,
        content: ContentStream,
        cancel: &CancellationToken,
    ) -> Result<(), SymbolError> {
        let path = derive_symbol_key(filename, key).ok_or_else(|| {
            SymbolError::InvalidAddress {
                filename: filename.to_string(),
                key: key.to_string(),
            }
        })?;

        match self
            .storage
            .put(path.as_str(), content, PDB_CONTENT_TYPE, cancel)
            .await?
        {
            StoragePutResult::Success => {
                debug!(path = %path, "saved portable pdb");
                Ok(())
            }
            StoragePutResult::Conflict => Err(SymbolError::Conflict { path }),
        }
    }

    /// Opens the portable PDB for `filename` and `key`.
    ///
    /// An invalid address or missing file yields `Ok(None)`. Other backend
    /// failures are returned as errors.
    pub async fn get_portable_pdb_content_stream_or_none(
        &self,
        filename: &str,
        key: &str,
    ) -> Result<Option<ContentStream>, StorageError> {
        let Some(path) = derive_symbol_key(filename, key) else {
            return Ok(None);
        };

        match self.storage.get(path.as_str()).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.is_not_found() => {
                debug!(path = %path, "portable pdb not found");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        fs::FileSystemStorageService,
        memory::MemoryStorageService,
        service::{content_from, read_content},
    };

    const KEY: &str = "0123456789ABCDEF0123456789ABCDEF";

    #[test]
    fn test_derive_symbol_key() {
        let key = derive_symbol_key("app.pdb", KEY).unwrap();
        assert_eq!(
            key.as_str(),
            concat!("symbols/app.pdb/", "0123456789abcdef0123456789abcdef", "ffffffff")
        );
        assert_eq!(key.as_str().rsplit('/').next().map(str::len), Some(40));
    }

    #[test]
    fn test_derive_symbol_key_is_deterministic() {
        let first = derive_symbol_key("Foo.PDB", KEY).unwrap();
        let second = derive_symbol_key("Foo.PDB", KEY).unwrap();
        assert_eq!(first.as_str().as_bytes(), second.as_str().as_bytes());
        assert!(first.as_str().starts_with("symbols/foo.pdb/"));
    }

    #[test]
    fn test_derive_symbol_key_truncates_long_keys() {
        let long = format!("{KEY}DEADBEEF");
        assert_eq!(derive_symbol_key("app.pdb", &long), derive_symbol_key("app.pdb", KEY));
    }

    #[test]
    fn test_derive_symbol_key_rejects_traversal() {
        let key = "0123456789abcdef0123456789abcdef";
        for filename in [
            "a/../../etc/passwd",
            "../app.pdb",
            "..",
            ".",
            "",
            "/etc/passwd",
            "nested/app.pdb",
            "app.pdb/",
            "..\\app.pdb",
        ] {
            assert!(
                derive_symbol_key(filename, key).is_none(),
                "{filename:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_derive_symbol_key_rejects_bad_keys() {
        assert!(derive_symbol_key("app.pdb", "not-hex-but-letters!!").is_none());
        assert!(derive_symbol_key("app.pdb", "0123456789abcdef").is_none());
        assert!(derive_symbol_key("app.pdb", "0123456789abcdef0123456789abcde-").is_none());
        assert!(derive_symbol_key("app.pdb", "0123456789abcdef0123456789abcdeé").is_none());
    }

    #[tokio::test]
    async fn test_save_and_get_portable_pdb() {
        let memory = Arc::new(MemoryStorageService::new());
        let symbols = SymbolStorageService::new(memory.clone());
        let cancel = CancellationToken::new();

        symbols
            .save_portable_pdb_content("App.pdb", KEY, content_from("pdb bytes"), &cancel)
            .await
            .unwrap();

        let path = derive_symbol_key("App.pdb", KEY).unwrap();
        assert_eq!(
            memory.content_type(path.as_str()).await.as_deref(),
            Some(PDB_CONTENT_TYPE)
        );

        let content = symbols
            .get_portable_pdb_content_stream_or_none("app.pdb", &KEY.to_lowercase())
            .await
            .unwrap()
            .map(read_content);
        let Some(content) = content else {
            panic!("expected stored pdb");
        };
        assert_eq!(&content.await.unwrap()[..], b"pdb bytes");
    }

    #[tokio::test]
    async fn test_save_conflict_is_typed() {
        let symbols = SymbolStorageService::new(Arc::new(MemoryStorageService::new()));
        let cancel = CancellationToken::new();

        symbols
            .save_portable_pdb_content("app.pdb", KEY, content_from("first"), &cancel)
            .await
            .unwrap();
        let result = symbols
            .save_portable_pdb_content("app.pdb", KEY, content_from("second"), &cancel)
            .await;

        assert!(matches!(result, Err(SymbolError::Conflict { .. })));
    }

    async fn concurrent_saves(storage: Arc<dyn StorageService>) {
        let symbols = SymbolStorageService::new(storage);
        let cancel = CancellationToken::new();

        let saves: Vec<_> = (0..8)
            .map(|i| {
                let symbols = symbols.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    symbols
                        .save_portable_pdb_content(
                            "App.pdb",
                            KEY,
                            content_from(format!("pdb {i}")),
                            &cancel,
                        )
                        .await
                })
            })
            .collect();

        let (mut saved, mut conflicts) = (0, 0);
        for save in saves {
            match save.await.unwrap() {
                Ok(()) => saved += 1,
                Err(SymbolError::Conflict { path }) => {
                    assert_eq!(Some(path), derive_symbol_key("App.pdb", KEY));
                    conflicts += 1;
                }
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!((saved, conflicts), (1, 7));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_in_memory() {
        concurrent_saves(Arc::new(MemoryStorageService::new())).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_on_file_system() {
        let dir = tempfile::tempdir().unwrap();
        concurrent_saves(Arc::new(FileSystemStorageService::new(dir.path()))).await;
    }

    #[tokio::test]
    async fn test_save_invalid_address() {
        let memory = Arc::new(MemoryStorageService::new());
        let symbols = SymbolStorageService::new(memory.clone());
        let cancel = CancellationToken::new();

        let result = symbols
            .save_portable_pdb_content("../app.pdb", KEY, content_from("x"), &cancel)
            .await;

        assert!(matches!(result, Err(SymbolError::InvalidAddress { .. })));
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_missing_or_invalid_is_none() {
        let symbols = SymbolStorageService::new(Arc::new(MemoryStorageService::new()));

        let missing = symbols
            .get_portable_pdb_content_stream_or_none("app.pdb", KEY)
            .await
            .unwrap();
        assert!(missing.is_none());

        let invalid = symbols
            .get_portable_pdb_content_stream_or_none("app.pdb", "short")
            .await
            .unwrap();
        assert!(invalid.is_none());
    }

    struct BrokenStorage;

    #[async_trait]
    impl StorageService for BrokenStorage {
        async fn put(
            &self,
            path: &str,
            _content: ContentStream,
            _content_type: &str,
            _cancel: &CancellationToken,
        ) -> crate::Result<StoragePutResult> {
            Err(StorageError::unavailable(path, io::Error::other("disk on fire")))
        }

        async fn get(&self, path: &str) -> crate::Result<ContentStream> {
            Err(StorageError::unavailable(path, io::Error::other("disk on fire")))
        }

        async fn delete(&self, _path: &str) -> crate::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_backend_failures_are_surfaced() {
        let symbols = SymbolStorageService::new(Arc::new(BrokenStorage));
        let cancel = CancellationToken::new();

        let get = symbols
            .get_portable_pdb_content_stream_or_none("app.pdb", KEY)
            .await;
        assert!(matches!(get, Err(StorageError::Unavailable { .. })));

        let save = symbols
            .save_portable_pdb_content("app.pdb", KEY, content_from("x"), &cancel)
            .await;
        assert!(matches!(save, Err(SymbolError::Storage(StorageError::Unavailable { .. }))));
    }
}
