use super::{
    SummarizationClient, SummarizationClientError, SummarizationRequest, classify_failure,
    http_client, unreachable,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Hugging Face inference API client (`POST {base_url}/{model}`).
pub struct HuggingFaceClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl HuggingFaceClient {
    /// Create a client for the hosted inference endpoint of `model`.
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, SummarizationClientError> {
        Ok(Self {
            http: http_client("docdigest/summary", timeout)?,
            api_key,
            model,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.model)
    }
}

/// Text generation and summarization pipelines answer with different field names, and
/// sometimes wrap the object in a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Many(Vec<Generation>),
    One(Generation),
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: Option<String>,
    #[serde(default)]
    summary_text: Option<String>,
}

impl Generation {
    fn into_text(self) -> Option<String> {
        self.generated_text.or(self.summary_text)
    }
}

#[async_trait]
impl SummarizationClient for HuggingFaceClient {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "inputs": request.prompt,
            "parameters": {
                "max_length": request.max_tokens,
                "temperature": 0.7,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| unreachable("Hugging Face", &self.base_url, error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure("Hugging Face", status, &body));
        }

        let body: InferenceResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Hugging Face response: {error}"
            ))
        })?;

        let generation = match body {
            InferenceResponse::Many(items) => items.into_iter().next(),
            InferenceResponse::One(item) => Some(item),
        };

        generation
            .and_then(Generation::into_text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse(
                    "Hugging Face returned no generated text".into(),
                )
            })
    }
}
