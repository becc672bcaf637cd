use bytes::Bytes;
use chrono::Utc;
use std::time::Duration;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{DisplayModel, FileRecord, ImageDetail};
use crate::ocr::OcrEngine;
use crate::services::RecognitionService;
use crate::storage::BlobStore;

/// Validity window for generated read URLs
const READ_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Image service
pub struct ImageService;

impl ImageService {
    /// List every record with a freshly signed read URL per entry
    pub async fn list_images(db: &Database, storage: &dyn BlobStore) -> Result<Vec<DisplayModel>> {
        let records: Vec<FileRecord> = sqlx::query_as("SELECT * FROM file_records")
            .fetch_all(db.pool())
            .await?;

        let mut display = Vec::with_capacity(records.len());
        for record in records {
            let url = storage.read_url(&record.file_name, READ_URL_TTL).await?;
            display.push(DisplayModel {
                name: record.file_name,
                url,
                content: record.content,
                description: record.description,
            });
        }

        Ok(display)
    }

    /// Get a record by blob name
    pub async fn get_record(db: &Database, blob_name: &str) -> Result<FileRecord> {
        let record: FileRecord = sqlx::query_as("SELECT * FROM file_records WHERE file_name = ?")
            .bind(blob_name)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No record for blob: {}", blob_name)))?;

        Ok(record)
    }

    /// Upload an image: recognize text, persist the record, store the blob
    pub async fn upload_image(
        db: &Database,
        storage: &dyn BlobStore,
        ocr: &dyn OcrEngine,
        config: &Config,
        file_name: String,
        description: String,
        data: Bytes,
    ) -> Result<FileRecord> {
        if data.is_empty() {
            return Err(AppError::BadRequest("Empty file".to_string()));
        }
        if file_name.is_empty() || file_name.contains('/') || file_name.contains('\\') {
            return Err(AppError::BadRequest("Invalid file name".to_string()));
        }

        let existing: Option<FileRecord> =
            sqlx::query_as("SELECT * FROM file_records WHERE file_name = ?")
                .bind(&file_name)
                .fetch_optional(db.pool())
                .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "An image with this name already exists".to_string(),
            ));
        }

        let content = RecognitionService::recognize(ocr, &config.ocr, data.clone()).await;

        let now = Utc::now().to_rfc3339();

        // The UNIQUE constraint backstops the existence check above when
        // two uploads of the same name race
        sqlx::query(
            r#"
            INSERT INTO file_records (file_name, content, description, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&file_name)
        .bind(&content)
        .bind(&description)
        .bind(&now)
        .execute(db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                AppError::Conflict("An image with this name already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

        // The record is not rolled back if the blob upload fails; the two
        // writes are not coupled in a transaction
        if let Err(e) = storage.put(&file_name, data).await {
            tracing::warn!(
                "Blob upload failed after metadata insert for {}: {}",
                file_name,
                e
            );
            return Err(e);
        }

        let record = Self::get_record(db, &file_name).await?;
        tracing::info!("Image upload finish: {}", record.file_name);
        Ok(record)
    }

    /// Detail view for one record
    pub async fn image_detail(
        db: &Database,
        storage: &dyn BlobStore,
        blob_name: &str,
    ) -> Result<ImageDetail> {
        let record = Self::get_record(db, blob_name).await?;
        let url = storage.read_url(&record.file_name, READ_URL_TTL).await?;

        Ok(ImageDetail {
            name: record.file_name,
            url,
            content: record.content,
        })
    }

    /// Fetch the raw blob for an existing record
    pub async fn download_image(
        db: &Database,
        storage: &dyn BlobStore,
        blob_name: &str,
    ) -> Result<(String, Bytes)> {
        let record = Self::get_record(db, blob_name).await?;
        let data = storage.get(&record.file_name).await?;
        Ok((record.file_name, data))
    }

    /// Delete the record, then the blob (idempotent on the blob side)
    pub async fn delete_image(
        db: &Database,
        storage: &dyn BlobStore,
        blob_name: &str,
    ) -> Result<()> {
        let record = Self::get_record(db, blob_name).await?;

        sqlx::query("DELETE FROM file_records WHERE id = ?")
            .bind(record.id)
            .execute(db.pool())
            .await?;

        // The row stays deleted even if this fails; the orphaned blob is
        // only reported
        if let Err(e) = storage.delete_if_exists(&record.file_name).await {
            tracing::error!(
                "Blob delete failed after metadata removal for {}: {}",
                record.file_name,
                e
            );
            return Err(e);
        }

        tracing::info!("Image delete finish: {}", record.file_name);
        Ok(())
    }
}
