use super::{OcrEngine, OcrError, OcrResult, parse_payload};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;

/// Sends the raw file bytes to an OCR HTTP service (`POST <url>`) once per attempt.
#[derive(Debug, Clone)]
pub struct HttpOcrEngine {
    http: Client,
    url: String,
}

impl HttpOcrEngine {
    /// Create an engine targeting `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, OcrError> {
        let http = Client::builder()
            .user_agent("docdigest/ocr")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn run(&self, path: &Path) -> Result<OcrResult, OcrError> {
        let bytes = tokio::fs::read(path).await?;
        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::UnexpectedStatus { status, body });
        }

        let body = response.bytes().await?;
        parse_payload(&body)
    }
}
