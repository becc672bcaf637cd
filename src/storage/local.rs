use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::{BlobConfig, ServerConfig};
use crate::error::{AppError, Result};
use crate::storage::{BlobStore, Signer};

/// Local file system blob store
///
/// Read URLs point back at this application's `/blobs/:name` route and are
/// authorized solely by their signature.
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_url: String,
    access_key: String,
}

impl LocalBlobStore {
    pub fn new(blob: &BlobConfig, server: &ServerConfig) -> Self {
        Self {
            base_path: PathBuf::from(&blob.local_path).join(&blob.container),
            public_url: server.public_url.trim_end_matches('/').to_string(),
            access_key: blob.access_key.clone(),
        }
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(AppError::BadRequest(format!("Invalid blob name: {}", name)));
        }
        Ok(self.base_path.join(name))
    }

    /// Signed route path for one blob
    pub fn route_path(name: &str) -> String {
        format!("/blobs/{}", urlencoding::encode(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_container(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    async fn put(&self, name: &str, data: Bytes) -> Result<()> {
        let full_path = self.blob_path(name)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!("Saved blob to {:?}", full_path);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes> {
        let full_path = self.blob_path(name)?;

        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("Blob not found: {}", name))
            } else {
                AppError::Storage(format!("Failed to read blob: {}", e))
            }
        })?;

        Ok(Bytes::from(data))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let full_path = self.blob_path(name)?;
        Ok(full_path.exists())
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool> {
        let full_path = self.blob_path(name)?;

        if !full_path.exists() {
            return Ok(false);
        }

        fs::remove_file(&full_path).await?;
        tracing::debug!("Deleted blob {:?}", full_path);
        Ok(true)
    }

    async fn read_url(&self, name: &str, expires: Duration) -> Result<String> {
        let path = Self::route_path(name);
        let token = Signer::new("get", &path).sign(&self.access_key, expires);
        Ok(format!(
            "{}{}?{}",
            self.public_url,
            path,
            token.query_string()
        ))
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_store() -> LocalBlobStore {
        let blob = BlobConfig {
            backend: "local".to_string(),
            container: "images".to_string(),
            endpoint: String::new(),
            access_key: "test-key".to_string(),
            local_path: std::env::temp_dir()
                .join(format!("imagecollector_test_{}", Uuid::new_v4()))
                .to_string_lossy()
                .to_string(),
        };
        LocalBlobStore::new(&blob, &ServerConfig::default())
    }

    #[tokio::test]
    async fn test_put_get_delete_roundtrip() {
        let store = test_store();
        store.ensure_container().await.unwrap();

        store
            .put("a.png", Bytes::from_static(b"image bytes"))
            .await
            .unwrap();
        assert!(store.exists("a.png").await.unwrap());
        assert_eq!(store.get("a.png").await.unwrap().as_ref(), b"image bytes");

        assert!(store.delete_if_exists("a.png").await.unwrap());
        assert!(!store.exists("a.png").await.unwrap());
        assert!(!store.delete_if_exists("a.png").await.unwrap());
        assert!(matches!(
            store.get("a.png").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_traversal_names() {
        let store = test_store();
        store.ensure_container().await.unwrap();

        for name in ["../escape", "a/b.png", "a\\b.png", ""] {
            assert!(matches!(
                store.put(name, Bytes::from_static(b"x")).await,
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_read_url_is_signed_and_scoped() {
        let store = test_store();
        let url = store
            .read_url("a b.png", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.contains("/blobs/a%20b.png?"));
        assert!(url.contains("sign-time="));
        assert!(url.contains("signature="));
    }
}
