//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Permanent object storage for finalized avatar artifacts.
///
/// Keys are slash-separated relative paths (`avatars/{owner}/{id}.glb`).
/// Implementations must make `put` atomic: a concurrent reader sees either
/// the previous object or the new one, never a partial write.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's metadata without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's full content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Get an object as a byte stream, for serving large models without
    /// buffering them whole.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Put an object atomically, replacing any existing object at the key.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object. Returns `NotFound` if the key does not exist.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Static identifier for the backend type ("filesystem", "s3"), used
    /// in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable and writable. Called at startup and
    /// from the health endpoint.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time, if the backend reports one.
    pub last_modified: Option<time::OffsetDateTime>,
    /// Content type, if the backend recorded one.
    pub content_type: Option<String>,
}
