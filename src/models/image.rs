use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata row for one uploaded image
///
/// `file_name` doubles as the blob name; the two must stay in sync.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub file_name: String,
    pub content: String,
    pub description: String,
    pub is_completed: bool,
    pub created_at: String,
}

/// Listing projection, built fresh per request
#[derive(Debug, Clone, Serialize)]
pub struct DisplayModel {
    pub name: String,
    /// Time-boxed signed read URL, regenerated on every listing call
    pub url: String,
    pub content: String,
    pub description: String,
}

/// Detail view for a single record
#[derive(Debug, Serialize)]
pub struct ImageDetail {
    pub name: String,
    pub url: String,
    pub content: String,
}

/// Upload form payload: the anti-forgery token to echo back on POST
#[derive(Debug, Serialize)]
pub struct UploadForm {
    pub antiforgery_token: String,
}

/// Query parameters addressing a record by blob name
#[derive(Debug, Deserialize)]
pub struct BlobNameQuery {
    #[serde(rename = "blobName", alias = "blob_name")]
    pub blob_name: Option<String>,
}
