pub mod client;

pub use client::*;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::Result;

/// Status of an asynchronous read operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

/// Result payload of a read operation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOperationResult {
    pub status: OperationStatus,
    #[serde(default)]
    pub analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default)]
    pub read_results: Vec<ReadResult>,
}

/// One recognized page
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResult {
    #[serde(default)]
    pub lines: Vec<Line>,
}

/// One recognized text line
#[derive(Debug, Clone, Deserialize)]
pub struct Line {
    pub text: String,
}

/// Text recognition engine
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Submit an image for recognition, returning the operation id
    async fn submit(&self, image: Bytes) -> Result<String>;

    /// Fetch the current state of a read operation
    async fn read_result(&self, operation_id: &str) -> Result<ReadOperationResult>;
}
