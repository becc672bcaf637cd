pub mod local;
pub mod provider;
pub mod remote;
pub mod signer;

pub use local::*;
pub use provider::*;
pub use remote::*;
pub use signer::*;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Build the configured blob store
pub fn from_config(config: &Config) -> Result<Arc<dyn BlobStore>> {
    match config.blob.backend.as_str() {
        "local" => Ok(Arc::new(LocalBlobStore::new(
            &config.blob,
            &config.server,
        ))),
        "remote" => {
            if config.blob.endpoint.is_empty() {
                return Err(AppError::Storage(
                    "blob endpoint not configured for remote backend".to_string(),
                ));
            }
            Ok(Arc::new(RemoteBlobStore::new(&config.blob)))
        }
        other => Err(AppError::Storage(format!(
            "unknown blob backend: {}",
            other
        ))),
    }
}
