use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    error::{Result, StorageError},
    path::segments,
    service::{content_from, read_content, ContentStream, StoragePutResult, StorageService},
};

#[derive(Debug, Clone)]
struct StoredObject {
    content: Bytes,
    content_type: String,
}

/// Process-local storage. Content is lost when the service is dropped.
#[derive(Debug, Default)]
pub struct MemoryStorageService {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Content type recorded when `path` was stored.
    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(path)
            .map(|object| object.content_type.clone())
    }
}

#[async_trait]
impl StorageService for MemoryStorageService {
    async fn put(
        &self,
        path: &str,
        content: ContentStream,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<StoragePutResult> {
        segments(path)?;

        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(StorageError::Cancelled { path: path.to_string() });
            }
            read = read_content(content) => {
                read.map_err(|err| StorageError::unavailable(path, err))?
            }
        };

        let mut objects = self.objects.write().await;
        if objects.contains_key(path) {
            return Ok(StoragePutResult::Conflict);
        }
        objects.insert(
            path.to_string(),
            StoredObject {
                content,
                content_type: content_type.to_string(),
            },
        );
        debug!(path, content_type, "stored object in memory");

        Ok(StoragePutResult::Success)
    }

    async fn get(&self, path: &str) -> Result<ContentStream> {
        segments(path)?;
        let objects = self.objects.read().await;
        match objects.get(path) {
            Some(object) => Ok(content_from(object.content.clone())),
            None => {
                Err(StorageError::NotFound {
                    path: path.to_string(),
                })
            }
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        segments(path)?;
        self.objects.write().await.remove(path);
        Ok(())
    }
}
