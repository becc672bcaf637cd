use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::storage::{LocalBlobStore, Signer};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BlobSignatureQuery {
    #[serde(rename = "sign-time")]
    pub sign_time: String,
    pub signature: String,
}

/// Serve a blob addressed by a signed, time-boxed URL
/// GET /blobs/:name?sign-time=&signature=
///
/// The signature is the sole authorization; this is what a signed read URL
/// resolves to when the local storage backend is configured.
pub async fn get_blob(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<BlobSignatureQuery>,
) -> Result<Response> {
    // The signature covers the encoded route path
    let path = LocalBlobStore::route_path(&name);
    let signer = Signer::new("get", &path);

    if !signer.verify(
        &state.config.blob.access_key,
        &query.sign_time,
        &query.signature,
        Utc::now().timestamp(),
    ) {
        return Err(AppError::Forbidden(
            "Invalid or expired blob signature".to_string(),
        ));
    }

    let data = state.storage.get(&name).await?;

    tracing::debug!("Blob served: {}", name);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
