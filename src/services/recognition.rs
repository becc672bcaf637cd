use bytes::Bytes;
use std::time::Duration;

use crate::config::OcrConfig;
use crate::error::{AppError, Result};
use crate::ocr::{OcrEngine, OperationStatus, ReadOperationResult};

/// Text recognition routine: submit, poll, concatenate
pub struct RecognitionService;

impl RecognitionService {
    /// Extract text from an image.
    ///
    /// Any failure (submit, polling, failed operation, exhausted attempt
    /// limit) degrades to an empty string instead of failing the caller.
    /// Whether "no text found" should stay indistinguishable from
    /// "recognition failed" is an open product question.
    pub async fn recognize(ocr: &dyn OcrEngine, config: &OcrConfig, image: Bytes) -> String {
        match Self::try_recognize(ocr, config, image).await {
            Ok(text) => {
                tracing::info!("Recognition finished ({} chars)", text.len());
                text
            }
            Err(e) => {
                tracing::warn!("Recognition degraded to empty content: {}", e);
                String::new()
            }
        }
    }

    async fn try_recognize(
        ocr: &dyn OcrEngine,
        config: &OcrConfig,
        image: Bytes,
    ) -> Result<String> {
        let operation_id = ocr.submit(image).await?;

        let mut delay = Duration::from_millis(config.poll_interval_ms);
        let max_delay = Duration::from_millis(config.poll_max_interval_ms);

        for _ in 0..config.poll_max_attempts {
            let result = ocr.read_result(&operation_id).await?;

            match result.status {
                OperationStatus::NotStarted | OperationStatus::Running => {
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, max_delay);
                }
                OperationStatus::Succeeded => return Ok(Self::join_lines(&result)),
                OperationStatus::Failed => {
                    return Err(AppError::Recognition(format!(
                        "read operation {} failed",
                        operation_id
                    )));
                }
            }
        }

        Err(AppError::Recognition(format!(
            "read operation {} still pending after {} polls",
            operation_id, config.poll_max_attempts
        )))
    }

    /// Every line of every page, in encountering order, newline-joined
    fn join_lines(result: &ReadOperationResult) -> String {
        let Some(analyze) = &result.analyze_result else {
            return String::new();
        };

        analyze
            .read_results
            .iter()
            .flat_map(|page| page.lines.iter())
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{AnalyzeResult, Line, ReadResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn pages(pages: &[&[&str]]) -> ReadOperationResult {
        ReadOperationResult {
            status: OperationStatus::Succeeded,
            analyze_result: Some(AnalyzeResult {
                read_results: pages
                    .iter()
                    .map(|lines| ReadResult {
                        lines: lines
                            .iter()
                            .map(|text| Line {
                                text: text.to_string(),
                            })
                            .collect(),
                    })
                    .collect(),
            }),
        }
    }

    fn pending(status: OperationStatus) -> ReadOperationResult {
        ReadOperationResult {
            status,
            analyze_result: None,
        }
    }

    /// Engine scripted with a fixed sequence of poll results
    struct ScriptedEngine {
        fail_submit: bool,
        results: Mutex<VecDeque<ReadOperationResult>>,
    }

    impl ScriptedEngine {
        fn new(results: Vec<ReadOperationResult>) -> Self {
            Self {
                fail_submit: false,
                results: Mutex::new(results.into()),
            }
        }
    }

    #[async_trait]
    impl OcrEngine for ScriptedEngine {
        async fn submit(&self, _image: Bytes) -> Result<String> {
            if self.fail_submit {
                return Err(AppError::Recognition("submit refused".to_string()));
            }
            Ok("op-1".to_string())
        }

        async fn read_result(&self, _operation_id: &str) -> Result<ReadOperationResult> {
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AppError::Recognition("no more scripted results".to_string()))
        }
    }

    fn fast_config() -> OcrConfig {
        OcrConfig {
            endpoint: String::new(),
            subscription_key: String::new(),
            poll_interval_ms: 1,
            poll_max_interval_ms: 2,
            poll_max_attempts: 5,
        }
    }

    #[tokio::test]
    async fn test_recognize_joins_pages_then_lines() {
        let engine = ScriptedEngine::new(vec![
            pending(OperationStatus::NotStarted),
            pending(OperationStatus::Running),
            pages(&[&["hello", "world"], &["second page"]]),
        ]);

        let text = RecognitionService::recognize(&engine, &fast_config(), Bytes::new()).await;
        assert_eq!(text, "hello\nworld\nsecond page");
    }

    #[tokio::test]
    async fn test_submit_failure_degrades_to_empty() {
        let mut engine = ScriptedEngine::new(vec![]);
        engine.fail_submit = true;

        let text = RecognitionService::recognize(&engine, &fast_config(), Bytes::new()).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_failed_operation_degrades_to_empty() {
        let engine = ScriptedEngine::new(vec![
            pending(OperationStatus::Running),
            pending(OperationStatus::Failed),
        ]);

        let text = RecognitionService::recognize(&engine, &fast_config(), Bytes::new()).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_exhausted_poll_attempts_degrades_to_empty() {
        let engine = ScriptedEngine::new(vec![
            pending(OperationStatus::Running),
            pending(OperationStatus::Running),
            pending(OperationStatus::Running),
            pending(OperationStatus::Running),
            pending(OperationStatus::Running),
        ]);

        let text = RecognitionService::recognize(&engine, &fast_config(), Bytes::new()).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_succeeded_with_no_pages_is_empty() {
        let engine = ScriptedEngine::new(vec![pages(&[])]);

        let text = RecognitionService::recognize(&engine, &fast_config(), Bytes::new()).await;
        assert_eq!(text, "");
    }
}
