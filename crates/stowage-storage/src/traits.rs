//! Backend adapter trait
//!
//! This module defines the capability set every storage backend exposes to the
//! facade. Adapters address objects by a resolved container and key only; path
//! handling, naming rules and identifier generation stay in the facade.

use crate::error::{BackendError, BackendResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upload input: any async reader, consumed until EOF.
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Download output: a stream of `Bytes` chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BackendError>> + Send>>;

/// Object returned by [`BackendAdapter::get`]
pub struct BackendObject {
    pub body: ByteStream,
    /// `None` when the backend keeps no content type for the object.
    pub content_type: Option<String>,
}

impl fmt::Debug for BackendObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendObject")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Storage backend capability interface
///
/// One implementation is selected at startup and shared behind an `Arc`.
/// Implementations must map native failures into [`BackendError`], reporting
/// missing objects as [`BackendError::NotFound`] where the backend can tell.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Write `data` under `container/key`, returning the number of bytes stored.
    async fn put(
        &self,
        container: &str,
        key: &str,
        data: ByteReader,
        content_type: &str,
    ) -> BackendResult<u64>;

    /// Open `container/key` for reading.
    async fn get(&self, container: &str, key: &str) -> BackendResult<BackendObject>;

    /// Remove `container/key`. Removing an absent object succeeds.
    async fn delete(&self, container: &str, key: &str) -> BackendResult<()>;

    async fn container_exists(&self, container: &str) -> BackendResult<bool>;

    async fn create_container(&self, container: &str) -> BackendResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Wrap an in-memory buffer as an upload reader.
pub fn bytes_reader(data: impl Into<Bytes>) -> ByteReader {
    Box::pin(std::io::Cursor::new(data.into()))
}

/// Drain a reader into memory, for backends whose put call takes a whole body.
pub async fn read_all(mut reader: ByteReader) -> BackendResult<Bytes> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).await?;
    Ok(Bytes::from(buffer))
}

/// Drain a download stream into one contiguous buffer.
pub async fn collect_stream(mut stream: ByteStream) -> BackendResult<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

/// A one-chunk stream over an in-memory buffer.
pub fn once_stream(data: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok(data) }))
}
