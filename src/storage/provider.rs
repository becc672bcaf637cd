use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::Result;

/// Blob store abstraction
///
/// Blobs are addressed by bare names (no path separators); the container
/// is fixed at construction.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the container if it does not exist yet
    async fn ensure_container(&self) -> Result<()>;

    /// Upload data under the given blob name
    async fn put(&self, name: &str, data: Bytes) -> Result<()>;

    /// Download a blob in full
    async fn get(&self, name: &str) -> Result<Bytes>;

    /// Check whether a blob exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Delete a blob if present; returns whether anything was deleted
    async fn delete_if_exists(&self, name: &str) -> Result<bool>;

    /// Generate a signed read URL valid for the given window
    async fn read_url(&self, name: &str, expires: Duration) -> Result<String>;

    /// Get the storage backend name
    fn storage_type(&self) -> &'static str;
}
