//! OCR extraction with bounded retries.
//!
//! An [`OcrEngine`] performs exactly one extraction attempt against an external engine, either a
//! child process ([`CommandOcrEngine`]) or an HTTP service ([`HttpOcrEngine`]). The
//! [`OcrInvoker`] wraps an engine with the linear retry policy and the "text must not be blank"
//! rule for local engines. Both engines speak the same JSON result shape:
//!
//! ```json
//! { "status": "success", "extracted_text": "...", "word_count": 2, "character_count": 11,
//!   "extracted_image": "<base64 png>", "confidence": 0.93, "quality_check": "..." }
//! ```

mod command;
mod http;

pub use command::CommandOcrEngine;
pub use http::HttpOcrEngine;

use crate::config::{OcrEngineKind, OcrSettings};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a single OCR attempt; the invoker surfaces the last one after exhausting retries.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine process could not be started.
    #[error("Failed to launch OCR engine `{program}`: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },
    /// The engine process exited unsuccessfully.
    #[error("OCR process failed with code {code:?}: {stderr}")]
    ProcessFailed {
        /// Exit code, absent when the process was killed by a signal.
        code: Option<i32>,
        /// Captured standard error output.
        stderr: String,
    },
    /// The attempt exceeded its time budget.
    #[error("OCR engine timed out after {0:?}")]
    Timeout(Duration),
    /// The OCR HTTP service could not be reached.
    #[error("OCR service request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The OCR HTTP service answered with a non-success status.
    #[error("OCR service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Response body.
        body: String,
    },
    /// The engine output was not a well-formed result.
    #[error("Failed to parse OCR results: {0}")]
    Parse(String),
    /// The engine reported `status: "error"`.
    #[error("OCR engine reported an error: {0}")]
    Engine(String),
    /// The engine succeeded but extracted no text.
    #[error("OCR engine extracted no text")]
    EmptyText,
    /// The uploaded file could not be read.
    #[error("Failed to read file for OCR: {0}")]
    Io(#[from] std::io::Error),
}

/// Text and enrichment data extracted from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    /// Extracted text, words joined by single spaces.
    pub extracted_text: String,
    /// Whitespace-separated word count.
    pub word_count: usize,
    /// Character count of the extracted text.
    pub character_count: usize,
    /// Base64 PNG with detection boxes drawn, when the engine renders one.
    pub annotated_image: Option<String>,
    /// Weighted detection confidence in `0.0..=1.0`, when reported.
    pub confidence: Option<f64>,
    /// Image quality assessment, when reported.
    pub quality_check: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OcrPayload {
    status: String,
    #[serde(default)]
    extracted_text: Option<String>,
    #[serde(default)]
    word_count: Option<usize>,
    #[serde(default)]
    character_count: Option<usize>,
    #[serde(default)]
    extracted_image: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    quality_check: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse the engine JSON into an [`OcrResult`], rejecting `status: "error"` payloads.
pub(crate) fn parse_payload(raw: &[u8]) -> Result<OcrResult, OcrError> {
    let payload: OcrPayload =
        serde_json::from_slice(raw).map_err(|error| OcrError::Parse(error.to_string()))?;

    if payload.status.eq_ignore_ascii_case("error") {
        return Err(OcrError::Engine(
            payload
                .error
                .unwrap_or_else(|| "unknown OCR failure".to_string()),
        ));
    }

    let extracted_text = payload.extracted_text.unwrap_or_default();
    let word_count = payload
        .word_count
        .unwrap_or_else(|| extracted_text.split_whitespace().count());
    let character_count = payload
        .character_count
        .unwrap_or_else(|| extracted_text.chars().count());

    Ok(OcrResult {
        extracted_text,
        word_count,
        character_count,
        annotated_image: payload.extracted_image.filter(|image| !image.is_empty()),
        confidence: payload.confidence,
        quality_check: payload.quality_check,
    })
}

/// A single OCR attempt against an external engine.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine identifier used in logs.
    fn name(&self) -> &'static str;

    /// Extract text from the file at `path`. No retries happen here.
    async fn run(&self, path: &Path) -> Result<OcrResult, OcrError>;
}

/// Runs an [`OcrEngine`] under the OCR retry policy.
pub struct OcrInvoker {
    engine: Box<dyn OcrEngine>,
    policy: RetryPolicy,
    require_text: bool,
}

impl OcrInvoker {
    /// Wrap `engine` with the given retry policy. Blank text is accepted by default.
    pub fn new(engine: Box<dyn OcrEngine>, policy: RetryPolicy) -> Self {
        Self {
            engine,
            policy,
            require_text: false,
        }
    }

    /// Treat results whose text is blank after trimming as failed attempts.
    pub fn require_text(mut self, require_text: bool) -> Self {
        self.require_text = require_text;
        self
    }

    /// Build the invoker described by the OCR settings.
    pub fn from_settings(settings: &OcrSettings, policy: RetryPolicy) -> Result<Self, OcrError> {
        let engine: Box<dyn OcrEngine> = match settings.engine {
            OcrEngineKind::Command => Box::new(CommandOcrEngine::new(
                settings.command.clone(),
                settings.args.clone(),
                settings.timeout,
            )),
            OcrEngineKind::Http => {
                let url = settings.url.clone().unwrap_or_default();
                Box::new(HttpOcrEngine::new(url, settings.timeout)?)
            }
        };
        Ok(Self::new(engine, policy).require_text(settings.require_text))
    }

    /// Extract text from `path`, retrying with linear backoff.
    ///
    /// Returns the first successful result, or the error of the final attempt once every
    /// attempt has failed.
    pub async fn extract(&self, path: &Path) -> Result<OcrResult, OcrError> {
        let mut attempt = 0;
        loop {
            match self.attempt(path).await {
                Ok(result) => {
                    tracing::debug!(
                        engine = self.engine.name(),
                        attempt = attempt + 1,
                        words = result.word_count,
                        "OCR attempt succeeded"
                    );
                    return Ok(result);
                }
                Err(error) => match self.policy.delay_after(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            engine = self.engine.name(),
                            attempt = attempt + 1,
                            retry_in_ms = delay.as_millis() as u64,
                            error = %error,
                            "OCR attempt failed; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        tracing::error!(
                            engine = self.engine.name(),
                            attempts = attempt + 1,
                            error = %error,
                            "OCR failed after exhausting retries"
                        );
                        return Err(error);
                    }
                },
            }
        }
    }

    async fn attempt(&self, path: &Path) -> Result<OcrResult, OcrError> {
        let result = self.engine.run(path).await?;
        if self.require_text && result.extracted_text.trim().is_empty() {
            return Err(OcrError::EmptyText);
        }
        Ok(result)
    }
}
