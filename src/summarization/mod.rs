//! Abstractive summarization over hosted and local LLM providers.
//!
//! Each provider adapter implements [`SummarizationClient`] and performs one request per call.
//! [`SummaryProvider`] owns the ordered list of adapters, applies exponential backoff per
//! provider, cascades to the next provider on exhaustion or quota errors, and degrades to a
//! placeholder summary carrying the raw extracted text when every provider has failed.

mod cascade;
mod gemini;
mod huggingface;
mod ollama;
mod openai;
pub mod prompt;

pub use cascade::{DEGRADED_SUMMARY, ProviderFailure, SummaryError, SummaryProvider, SummaryResult};
pub use gemini::GeminiClient;
pub use huggingface::HuggingFaceClient;
pub use ollama::OllamaSummarizationClient;
pub use openai::OpenAiClient;

use crate::config::{SummarizationProvider, SummarySettings};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on generated tokens requested from every provider.
pub const MAX_SUMMARY_TOKENS: u32 = 500;

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or not configured.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider rejected the call because the account ran out of quota or credits.
    #[error("Summarization quota exceeded: {0}")]
    QuotaExceeded(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or carried no text.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl SummarizationClientError {
    /// Whether retrying the same provider may succeed.
    ///
    /// Quota and malformed-response errors move straight on to the next provider.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::GenerationFailed(_))
    }
}

/// Request payload passed to a summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Prompt assembled from the extracted text and document context.
    pub prompt: String,
    /// Maximum number of tokens the provider may generate.
    pub max_tokens: u32,
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Provider identifier reported in results and logs.
    fn name(&self) -> &'static str;

    /// Generate a summary for the prompt with a single provider call.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build the provider adapters listed in the settings, in cascade order.
///
/// Hosted providers without an API key are skipped with a warning so a partially configured
/// deployment still summarizes with whatever it has.
pub fn build_clients(
    settings: &SummarySettings,
) -> Result<Vec<Arc<dyn SummarizationClient>>, SummarizationClientError> {
    let mut clients: Vec<Arc<dyn SummarizationClient>> = Vec::new();
    for provider in &settings.providers {
        let client: Arc<dyn SummarizationClient> = match provider {
            SummarizationProvider::OpenAI => match settings.openai.api_key.clone() {
                Some(key) => Arc::new(OpenAiClient::new(
                    key,
                    settings.openai.model.clone(),
                    settings.openai.base_url.clone(),
                    settings.timeout,
                )?),
                None => {
                    skip_unconfigured(*provider, "OPENAI_API_KEY");
                    continue;
                }
            },
            SummarizationProvider::HuggingFace => match settings.huggingface.api_key.clone() {
                Some(key) => Arc::new(HuggingFaceClient::new(
                    key,
                    settings.huggingface.model.clone(),
                    settings.huggingface.base_url.clone(),
                    settings.timeout,
                )?),
                None => {
                    skip_unconfigured(*provider, "HUGGING_FACE_API_KEY");
                    continue;
                }
            },
            SummarizationProvider::Gemini => match settings.gemini.api_key.clone() {
                Some(key) => Arc::new(GeminiClient::new(
                    key,
                    settings.gemini.model.clone(),
                    settings.gemini.base_url.clone(),
                    settings.timeout,
                )?),
                None => {
                    skip_unconfigured(*provider, "GEMINI_API_KEY");
                    continue;
                }
            },
            SummarizationProvider::Ollama => Arc::new(OllamaSummarizationClient::new(
                settings.ollama.base_url.clone(),
                settings.ollama.model.clone(),
                settings.timeout,
            )?),
        };
        tracing::info!(provider = client.name(), "Summarization provider enabled");
        clients.push(client);
    }

    if clients.is_empty() {
        tracing::warn!("No summarization providers configured; summaries will be degraded");
    }
    Ok(clients)
}

fn skip_unconfigured(provider: SummarizationProvider, variable: &str) {
    tracing::warn!(
        provider = provider.as_str(),
        missing = variable,
        "Skipping summarization provider without credentials"
    );
}

pub(crate) fn http_client(
    user_agent: &str,
    timeout: Duration,
) -> Result<Client, SummarizationClientError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|error| {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to construct HTTP client: {error}"
            ))
        })
}

/// Map a non-success provider response onto the error taxonomy.
///
/// Bodies mentioning quota (`insufficient_quota`, `quota_exceeded`, "exceeded your current
/// quota") and `402 Payment Required` are quota errors; everything else is a generic failure.
pub(crate) fn classify_failure(
    provider: &str,
    status: StatusCode,
    body: &str,
) -> SummarizationClientError {
    let message = format!("{provider} returned {status}: {body}");
    if status == StatusCode::PAYMENT_REQUIRED || body.to_lowercase().contains("quota") {
        SummarizationClientError::QuotaExceeded(message)
    } else {
        SummarizationClientError::GenerationFailed(message)
    }
}

pub(crate) fn unreachable(provider: &str, url: &str, error: reqwest::Error) -> SummarizationClientError {
    SummarizationClientError::ProviderUnavailable(format!(
        "failed to reach {provider} at {url}: {}",
        error.without_url()
    ))
}
