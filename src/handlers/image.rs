use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use bytes::{Bytes, BytesMut};

use crate::config::Config;
use crate::error::{ApiResponse, AppError, Result};
use crate::models::{BlobNameQuery, CurrentUser, DisplayModel, ImageDetail, UploadForm};
use crate::services::{AntiForgeryService, ImageService};
use crate::AppState;

const WATCH_ROUTE: &str = "/api/v1/images/watch";

/// Upload and delete require an organizational account
fn ensure_org_member(user: &CurrentUser, config: &Config) -> Result<()> {
    if !user.is_member_of(&config.auth.org_domain) {
        return Err(AppError::Forbidden(format!(
            "Requires a {} account",
            config.auth.org_domain
        )));
    }
    Ok(())
}

fn require_blob_name(query: BlobNameQuery) -> Result<String> {
    match query.blob_name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(AppError::BadRequest("Missing blob name".to_string())),
    }
}

/// Entry page
/// GET /api/v1/images
pub async fn index() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(serde_json::json!({
        "service": "imagecollector",
        "routes": {
            "watch": WATCH_ROUTE,
            "upload": "/api/v1/images/upload",
            "details": "/api/v1/images/details?blobName=",
            "download": "/api/v1/images/download?blobName=",
            "delete": "/api/v1/images/delete?blobName=",
        },
    })))
}

/// List uploaded images
/// GET /api/v1/images/watch
pub async fn watch(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<DisplayModel>>>> {
    let images = ImageService::list_images(&state.db, state.storage.as_ref()).await?;

    tracing::info!("Images watch: {} records", images.len());
    Ok(Json(ApiResponse::success(images)))
}

/// Upload form: hands out the anti-forgery token for the POST
/// GET /api/v1/images/upload
pub async fn upload_form(State(state): State<AppState>) -> Json<ApiResponse<UploadForm>> {
    Json(ApiResponse::success(UploadForm {
        antiforgery_token: AntiForgeryService::issue(&state.config.auth),
    }))
}

/// Upload an image
/// POST /api/v1/images/upload
pub async fn upload(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    ensure_org_member(&current_user, &state.config)?;

    let mut description = String::new();
    let mut antiforgery_token: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut file_data: Option<Bytes> = None;

    // Process multipart fields
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to process multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());

                // Buffer the image; recognition and the blob upload both
                // need the full payload
                let mut buf = BytesMut::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file chunk: {}", e)))?
                {
                    buf.extend_from_slice(&chunk);
                }
                file_data = Some(buf.freeze());
            }
            "description" => {
                description = field.text().await.unwrap_or_default();
            }
            "antiforgery_token" => {
                antiforgery_token = Some(field.text().await.unwrap_or_default());
            }
            _ => {}
        }
    }

    let token = antiforgery_token
        .ok_or_else(|| AppError::BadRequest("Missing anti-forgery token".to_string()))?;
    AntiForgeryService::verify(&state.config.auth, &token)?;

    let file_name =
        file_name.ok_or_else(|| AppError::BadRequest("No file name provided".to_string()))?;
    let data = file_data.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    tracing::info!("Image upload start: {}", file_name);

    ImageService::upload_image(
        &state.db,
        state.storage.as_ref(),
        state.ocr.as_ref(),
        &state.config,
        file_name,
        description,
        data,
    )
    .await?;

    Ok(Redirect::to(WATCH_ROUTE))
}

/// Show one record's detail
/// GET /api/v1/images/details?blobName=
pub async fn details(
    State(state): State<AppState>,
    Query(query): Query<BlobNameQuery>,
) -> Result<Json<ApiResponse<ImageDetail>>> {
    let blob_name = require_blob_name(query)?;
    let detail = ImageService::image_detail(&state.db, state.storage.as_ref(), &blob_name).await?;

    tracing::info!("Image details: {}", detail.name);
    Ok(Json(ApiResponse::success(detail)))
}

/// Stream raw blob bytes back to the caller
/// GET /api/v1/images/download?blobName=
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<BlobNameQuery>,
) -> Result<Response> {
    let blob_name = require_blob_name(query)?;
    let (name, data) =
        ImageService::download_image(&state.db, state.storage.as_ref(), &blob_name).await?;

    tracing::info!("Image download: {}", name);

    let fallback_name = name.replace(['"', '\\'], "_");
    let encoded_name = urlencoding::encode(&name);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Delete a record and its blob
/// GET /api/v1/images/delete?blobName=
pub async fn delete(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<BlobNameQuery>,
) -> Result<impl IntoResponse> {
    ensure_org_member(&current_user, &state.config)?;

    let blob_name = require_blob_name(query)?;
    ImageService::delete_image(&state.db, state.storage.as_ref(), &blob_name).await?;

    Ok(Redirect::to(WATCH_ROUTE))
}
