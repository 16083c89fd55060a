//! File system storage backend.
//!
//! Objects live under a root directory, one file per path. Writes go to a
//! temporary file next to the target and are published with a no-clobber
//! link, so readers never observe partial content and an existing object is
//! never replaced.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    error::{Result, StorageError},
    path::segments,
    service::{ContentStream, StoragePutResult, StorageService},
};

const UPLOAD_PREFIX: &str = ".upload-";

#[derive(Debug, Clone)]
pub struct FileSystemStorageService {
    root: PathBuf,
}

impl FileSystemStorageService {
    /// Storage rooted at `root`. Directories are created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        resolved.extend(segments(path)?);
        Ok(resolved)
    }
}

#[async_trait]
impl StorageService for FileSystemStorageService {
    async fn put(
        &self,
        path: &str,
        mut content: ContentStream,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<StoragePutResult> {
        let target = self.resolve(path)?;
        let Some(dir) = target.parent() else {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                reason: "path has no parent directory",
            });
        };

        let exists = fs::try_exists(&target)
            .await
            .map_err(|err| StorageError::unavailable(path, err))?;
        if exists {
            trace!(path, "object already exists");
            return Ok(StoragePutResult::Conflict);
        }

        fs::create_dir_all(dir)
            .await
            .map_err(|err| StorageError::unavailable(path, err))?;

        let tmp = tempfile::Builder::new()
            .prefix(UPLOAD_PREFIX)
            .tempfile_in(dir)
            .map_err(|err| StorageError::unavailable(path, err))?;
        let mut file = tmp
            .reopen()
            .map(fs::File::from_std)
            .map_err(|err| StorageError::unavailable(path, err))?;

        let write = async {
            tokio::io::copy(&mut content, &mut file).await?;
            file.flush().await?;
            file.sync_all().await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(path, "upload cancelled");
                return Err(StorageError::Cancelled { path: path.to_string() });
            }
            written = write => written.map_err(|err| StorageError::unavailable(path, err))?,
        }
        drop(file);

        let destination = target.clone();
        let persisted = tokio::task::spawn_blocking(move || tmp.persist_noclobber(destination))
            .await
            .map_err(|err| StorageError::unavailable(path, io::Error::other(err)))?;

        match persisted {
            Ok(_) => {
                debug!(path, content_type, "stored object");
                Ok(StoragePutResult::Success)
            }
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                trace!(path, "lost race for object");
                Ok(StoragePutResult::Conflict)
            }
            Err(err) => Err(StorageError::unavailable(path, err.error)),
        }
    }

    async fn get(&self, path: &str) -> Result<ContentStream> {
        let target = self.resolve(path)?;
        let file = fs::File::open(&target)
            .await
            .map_err(|err| StorageError::from_io(path, err))?;
        Ok(Box::pin(file))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => {
                debug!(path, "deleted object");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::unavailable(path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::{content_from, read_content};

    fn storage() -> (tempfile::TempDir, FileSystemStorageService) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorageService::new(dir.path().join("storage"));
        (dir, storage)
    }

    fn leftover_uploads(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name().to_string_lossy().starts_with(UPLOAD_PREFIX))
                    .count()
            })
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (_dir, storage) = storage();
        let cancel = CancellationToken::new();

        let result = storage
            .put("packages/a/1.0.0/a.nupkg", content_from("package"), "binary/octet-stream", &cancel)
            .await
            .unwrap();
        assert_eq!(result, StoragePutResult::Success);

        let content = storage.get("packages/a/1.0.0/a.nupkg").await.unwrap();
        assert_eq!(&read_content(content).await.unwrap()[..], b"package");
        assert_eq!(leftover_uploads(&storage.root().join("packages/a/1.0.0")), 0);
    }

    #[tokio::test]
    async fn test_put_never_overwrites() {
        let (_dir, storage) = storage();
        let cancel = CancellationToken::new();

        storage
            .put("obj", content_from("first"), "text/plain", &cancel)
            .await
            .unwrap();
        let result = storage
            .put("obj", content_from("second"), "text/plain", &cancel)
            .await
            .unwrap();

        assert_eq!(result, StoragePutResult::Conflict);
        let content = storage.get("obj").await.unwrap();
        assert_eq!(&read_content(content).await.unwrap()[..], b"first");
    }

    #[tokio::test]
    async fn test_concurrent_puts_have_one_winner() {
        let (_dir, storage) = storage();
        let storage = Arc::new(storage);
        let cancel = CancellationToken::new();

        let (a, b) = tokio::join!(
            storage.put("race/obj", content_from("alpha"), "text/plain", &cancel),
            storage.put("race/obj", content_from("bravo"), "text/plain", &cancel),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        let winner = match (a, b) {
            (StoragePutResult::Success, StoragePutResult::Conflict) => &b"alpha"[..],
            (StoragePutResult::Conflict, StoragePutResult::Success) => &b"bravo"[..],
            other => panic!("expected exactly one success, got {other:?}"),
        };

        let content = storage.get("race/obj").await.unwrap();
        assert_eq!(&read_content(content).await.unwrap()[..], winner);
        assert_eq!(leftover_uploads(&storage.root().join("race")), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_writers_have_one_winner() {
        let (_dir, storage) = storage();
        let storage = Arc::new(storage);
        let cancel = CancellationToken::new();

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let body = format!("writer-{i}");
                    let result = storage
                        .put("race/many", content_from(body.clone()), "text/plain", &cancel)
                        .await
                        .unwrap();
                    (result, body)
                })
            })
            .collect();

        let mut winners = Vec::new();
        for writer in writers {
            let (result, body) = writer.await.unwrap();
            if result == StoragePutResult::Success {
                winners.push(body);
            }
        }

        assert_eq!(winners.len(), 1, "winners: {winners:?}");
        let content = storage.get("race/many").await.unwrap();
        assert_eq!(&read_content(content).await.unwrap()[..], winners[0].as_bytes());
        assert_eq!(leftover_uploads(&storage.root().join("race")), 0);
    }

    #[tokio::test]
    async fn test_unreadable_target_is_unavailable() {
        let (_dir, storage) = storage();
        let cancel = CancellationToken::new();
        std::fs::create_dir_all(storage.root()).unwrap();
        std::fs::write(storage.root().join("blocker"), b"file").unwrap();

        let result = storage
            .put("blocker/obj", content_from("x"), "text/plain", &cancel)
            .await;

        assert!(matches!(
            result,
            Err(StorageError::Unavailable { ref path, .. }) if path == "blocker/obj"
        ));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, storage) = storage();
        let Err(err) = storage.get("missing/obj").await else {
            panic!("expected missing object");
        };
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, storage) = storage();
        let cancel = CancellationToken::new();

        storage.delete("never/written").await.unwrap();

        storage
            .put("obj", content_from("x"), "text/plain", &cancel)
            .await
            .unwrap();
        storage.delete("obj").await.unwrap();
        storage.delete("obj").await.unwrap();
        assert!(matches!(storage.get("obj").await, Err(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_cancelled_put_leaves_nothing() {
        let (_dir, storage) = storage();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = storage
            .put("cancelled/obj", content_from("partial"), "text/plain", &cancel)
            .await;

        assert!(matches!(result, Err(StorageError::Cancelled { .. })));
        assert!(matches!(storage.get("cancelled/obj").await, Err(e) if e.is_not_found()));
        assert_eq!(leftover_uploads(&storage.root().join("cancelled")), 0);
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let (_dir, storage) = storage();
        let cancel = CancellationToken::new();

        let result = storage
            .put("../outside", content_from("x"), "text/plain", &cancel)
            .await;
        assert!(matches!(result, Err(StorageError::InvalidPath { .. })));
        assert!(matches!(
            storage.get("/etc/passwd").await,
            Err(StorageError::InvalidPath { .. })
        ));
    }
}
