use super::prompt::build_prompt;
use super::{MAX_SUMMARY_TOKENS, SummarizationClient, SummarizationClientError, SummarizationRequest};
use crate::retry::RetryPolicy;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Placeholder summary used when no provider produced one.
pub const DEGRADED_SUMMARY: &str = "Summary generation is currently unavailable due to API limits and fallback failure. Here's the extracted text:";

/// Outcome of summarizing one document.
///
/// A generated summary names the provider that wrote it. A degraded summary carries the
/// placeholder text, the verbatim extracted text and an error marker instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    /// Summary text, or the placeholder when degraded.
    pub text: String,
    /// Provider that produced the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Verbatim extracted text, present only when degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Why summarization degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummaryResult {
    /// Summary written by `provider`.
    pub fn generated(text: String, provider: &str) -> Self {
        Self {
            text,
            provider: Some(provider.to_string()),
            extracted_text: None,
            error: None,
        }
    }

    /// Placeholder summary preserving the extracted text.
    pub fn degraded(extracted_text: &str, error: &SummaryError) -> Self {
        Self {
            text: DEGRADED_SUMMARY.to_string(),
            provider: None,
            extracted_text: Some(extracted_text.to_string()),
            error: Some(error.to_string()),
        }
    }

    /// Whether every provider failed for this document.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// One provider's terminal failure inside a cascade.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    /// Provider identifier.
    pub provider: &'static str,
    /// Final error message reported by the provider.
    pub message: String,
}

/// Raised when the cascade cannot produce a summary; recovered into a degraded [`SummaryResult`].
#[derive(Debug, Error)]
pub enum SummaryError {
    /// No provider is configured.
    #[error("No summarization providers configured")]
    NoProviders,
    /// Every provider failed.
    #[error("All fallback APIs failed")]
    Exhausted {
        /// Failures in cascade order.
        failures: Vec<ProviderFailure>,
    },
}

/// Ordered cascade of summarization providers.
///
/// Each provider is retried with exponential backoff on transient errors; quota errors and
/// malformed responses skip straight to the next provider. [`SummaryProvider::summarize`] never
/// fails: it degrades to a placeholder that keeps the extracted text.
pub struct SummaryProvider {
    providers: Vec<Arc<dyn SummarizationClient>>,
    policy: RetryPolicy,
}

impl SummaryProvider {
    /// Build a cascade trying `providers` in order, each under `policy`.
    pub fn new(providers: Vec<Arc<dyn SummarizationClient>>, policy: RetryPolicy) -> Self {
        Self { providers, policy }
    }

    /// Provider identifiers in cascade order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Summarize `extracted_text` described by `context`, degrading instead of failing.
    pub async fn summarize(&self, extracted_text: &str, context: &str) -> SummaryResult {
        match self.try_summarize(extracted_text, context).await {
            Ok(result) => result,
            Err(error) => {
                if let SummaryError::Exhausted { failures } = &error {
                    for failure in failures {
                        tracing::debug!(
                            provider = failure.provider,
                            error = %failure.message,
                            "Provider failure recorded"
                        );
                    }
                }
                tracing::warn!(error = %error, "Summarization degraded; returning extracted text");
                SummaryResult::degraded(extracted_text, &error)
            }
        }
    }

    /// Run the cascade, reporting every provider failure when none succeeds.
    pub async fn try_summarize(
        &self,
        extracted_text: &str,
        context: &str,
    ) -> Result<SummaryResult, SummaryError> {
        if self.providers.is_empty() {
            return Err(SummaryError::NoProviders);
        }

        let request = SummarizationRequest {
            prompt: build_prompt(extracted_text, context),
            max_tokens: MAX_SUMMARY_TOKENS,
        };

        let mut failures = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match self.call_with_backoff(provider.as_ref(), &request).await {
                Ok(text) => {
                    tracing::debug!(provider = provider.name(), "Summary generated");
                    return Ok(SummaryResult::generated(text, provider.name()));
                }
                Err(error) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %error,
                        "Summarization provider failed; falling back"
                    );
                    failures.push(ProviderFailure {
                        provider: provider.name(),
                        message: error.to_string(),
                    });
                }
            }
        }

        Err(SummaryError::Exhausted { failures })
    }

    async fn call_with_backoff(
        &self,
        provider: &dyn SummarizationClient,
        request: &SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let mut attempt = 0;
        loop {
            let error = match provider.generate_summary(request.clone()).await {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => {
                    return Err(SummarizationClientError::InvalidResponse(
                        "provider returned an empty summary".into(),
                    ));
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            match self.policy.delay_after(attempt) {
                Some(delay) => {
                    tracing::debug!(
                        provider = provider.name(),
                        attempt = attempt + 1,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %error,
                        "Summarization attempt failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(error),
            }
        }
    }
}
