use std::{io, pin::Pin};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A readable stream of object content.
pub type ContentStream = Pin<Box<dyn AsyncRead + Send>>;

/// Outcome of a write-once [`StorageService::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePutResult {
    /// The content was stored.
    Success,
    /// Content already exists at the path and was left untouched.
    Conflict,
}

/// Blob storage addressed by relative, `/`-separated paths.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Stores `content` at `path` unless something is already there.
    ///
    /// Concurrent writers to one path see exactly one `Success`. A cancelled
    /// or failed write leaves nothing visible at `path`.
    async fn put(
        &self,
        path: &str,
        content: ContentStream,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<StoragePutResult>;

    /// Opens the content at `path`, failing with
    /// [`StorageError::NotFound`](crate::StorageError::NotFound) when there
    /// is none.
    async fn get(&self, path: &str) -> Result<ContentStream>;

    /// Removes the content at `path`. Missing content is not an error.
    async fn delete(&self, path: &str) -> Result<()>;
}

pub fn content_from(bytes: impl Into<Bytes>) -> ContentStream {
    Box::pin(io::Cursor::new(bytes.into()))
}

/// Reads a whole stream into memory.
pub async fn read_content(mut content: ContentStream) -> io::Result<Bytes> {
    let mut buf = Vec::new();
    content.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}
