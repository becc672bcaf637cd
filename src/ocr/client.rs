use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;

use crate::config::OcrConfig;
use crate::error::{AppError, Result};
use crate::ocr::{OcrEngine, ReadOperationResult};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const READ_ANALYZE_PATH: &str = "/vision/v3.2/read/analyze";
const READ_RESULTS_PATH: &str = "/vision/v3.2/read/analyzeResults";

/// Client for the asynchronous read (OCR) API
#[derive(Debug, Clone)]
pub struct ReadClient {
    http: reqwest::Client,
    endpoint: String,
    subscription_key: String,
}

impl ReadClient {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            subscription_key: config.subscription_key.clone(),
        }
    }
}

/// The Operation-Location header ends with the operation id
fn operation_id_from_location(location: &str) -> Option<&str> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl OcrEngine for ReadClient {
    async fn submit(&self, image: Bytes) -> Result<String> {
        let url = format!("{}{}", self.endpoint, READ_ANALYZE_PATH);

        let resp = self
            .http
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Recognition(format!(
                "read submit returned {}",
                resp.status()
            )));
        }

        let location = resp
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Recognition("read submit response missing Operation-Location".to_string())
            })?;

        let operation_id = operation_id_from_location(location).ok_or_else(|| {
            AppError::Recognition(format!("malformed Operation-Location: {}", location))
        })?;

        tracing::debug!("Read operation submitted: {}", operation_id);
        Ok(operation_id.to_string())
    }

    async fn read_result(&self, operation_id: &str) -> Result<ReadOperationResult> {
        let url = format!("{}{}/{}", self.endpoint, READ_RESULTS_PATH, operation_id);

        let resp = self
            .http
            .get(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Recognition(format!(
                "read result returned {}",
                resp.status()
            )));
        }

        Ok(resp.json::<ReadOperationResult>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OperationStatus;

    #[test]
    fn test_operation_id_from_location() {
        let location =
            "https://host/vision/v3.2/read/analyzeResults/0e4f0f09-1d2f-4e33-9a6c-1b5f3b2a0c71";
        assert_eq!(
            operation_id_from_location(location),
            Some("0e4f0f09-1d2f-4e33-9a6c-1b5f3b2a0c71")
        );
        assert_eq!(
            operation_id_from_location("https://host/read/abc/"),
            Some("abc")
        );
        assert_eq!(operation_id_from_location(""), None);
    }

    #[test]
    fn test_read_operation_result_deserialization() {
        let json = r#"{
            "status": "succeeded",
            "analyzeResult": {
                "readResults": [
                    {"lines": [{"text": "hello"}, {"text": "world"}]}
                ]
            }
        }"#;
        let result: ReadOperationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.status, OperationStatus::Succeeded);
        let pages = result.analyze_result.unwrap().read_results;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines[1].text, "world");
    }

    #[test]
    fn test_pending_result_without_analyze_result() {
        let json = r#"{"status": "notStarted"}"#;
        let result: ReadOperationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.status, OperationStatus::NotStarted);
        assert!(result.analyze_result.is_none());
    }
}
