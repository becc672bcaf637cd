use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;

use crate::config::BlobConfig;
use crate::error::{AppError, Result};
use crate::storage::{BlobStore, Signer};

/// Window attached to request-auth signatures (not to read URLs)
const REQUEST_SIGNATURE_TTL: Duration = Duration::from_secs(600);

/// HTTP object store client with signed requests and signed read URLs
#[derive(Debug, Clone)]
pub struct RemoteBlobStore {
    http: reqwest::Client,
    endpoint: String,
    container: String,
    access_key: String,
}

impl RemoteBlobStore {
    pub fn new(config: &BlobConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            container: config.container.clone(),
            access_key: config.access_key.clone(),
        }
    }

    fn container_path(&self) -> String {
        format!("/{}", self.container)
    }

    fn object_path(&self, name: &str) -> String {
        format!("/{}/{}", self.container, urlencoding::encode(name))
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn auth_header(&self, method: &str, path: &str) -> String {
        Signer::new(method, path)
            .sign(&self.access_key, REQUEST_SIGNATURE_TTL)
            .header_value()
    }
}

#[async_trait]
impl BlobStore for RemoteBlobStore {
    async fn ensure_container(&self) -> Result<()> {
        let path = self.container_path();
        let resp = self
            .http
            .put(self.url_for(&path))
            .header(AUTHORIZATION, self.auth_header("put", &path))
            .send()
            .await?;

        // Already-existing container is fine
        if resp.status().is_success() || resp.status() == StatusCode::CONFLICT {
            return Ok(());
        }

        Err(AppError::Storage(format!(
            "container create returned {}",
            resp.status()
        )))
    }

    async fn put(&self, name: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(name);
        let resp = self
            .http
            .put(self.url_for(&path))
            .header(AUTHORIZATION, self.auth_header("put", &path))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "blob upload returned {}",
                resp.status()
            )));
        }

        tracing::debug!("Uploaded blob {}", name);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes> {
        let path = self.object_path(name);
        let resp = self
            .http
            .get(self.url_for(&path))
            .header(AUTHORIZATION, self.auth_header("get", &path))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Blob not found: {}", name)));
        }
        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "blob download returned {}",
                resp.status()
            )));
        }

        Ok(resp.bytes().await?)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.object_path(name);
        let resp = self
            .http
            .head(self.url_for(&path))
            .header(AUTHORIZATION, self.auth_header("head", &path))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "blob head returned {}",
                resp.status()
            )));
        }

        Ok(true)
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool> {
        let path = self.object_path(name);
        let resp = self
            .http
            .delete(self.url_for(&path))
            .header(AUTHORIZATION, self.auth_header("delete", &path))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "blob delete returned {}",
                resp.status()
            )));
        }

        tracing::debug!("Deleted blob {}", name);
        Ok(true)
    }

    async fn read_url(&self, name: &str, expires: Duration) -> Result<String> {
        let path = self.object_path(name);
        let token = Signer::new("get", &path).sign(&self.access_key, expires);
        Ok(format!("{}?{}", self.url_for(&path), token.query_string()))
    }

    fn storage_type(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> RemoteBlobStore {
        RemoteBlobStore::new(&BlobConfig {
            backend: "remote".to_string(),
            container: "images".to_string(),
            endpoint: "https://blobs.example.com/".to_string(),
            access_key: "key".to_string(),
            local_path: String::new(),
        })
    }

    #[test]
    fn test_object_path_encodes_names() {
        let store = test_store();
        assert_eq!(store.object_path("a.png"), "/images/a.png");
        assert_eq!(store.object_path("a b.png"), "/images/a%20b.png");
    }

    #[tokio::test]
    async fn test_read_url_shape() {
        let store = test_store();
        let url = store
            .read_url("a.png", Duration::from_secs(86_400))
            .await
            .unwrap();
        assert!(url.starts_with("https://blobs.example.com/images/a.png?"));
        assert!(url.contains("sign-time="));
        assert!(url.contains("signature="));
    }
}
