use super::{
    SummarizationClient, SummarizationClientError, SummarizationRequest, classify_failure,
    http_client, unreachable,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes documents and their contents concisely and accurately.";

/// OpenAI-compatible chat completions client.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client for `{base_url}/chat/completions`.
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
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl SummarizationClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": request.prompt },
            ],
            "max_tokens": request.max_tokens,
            "temperature": 0.7,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| unreachable("OpenAI", &self.base_url, error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure("OpenAI", status, &body));
        }

        let completion: ChatCompletion = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode OpenAI response: {error}"
            ))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("OpenAI returned no message content".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(base_url: String) -> OpenAiClient {
        OpenAiClient::new(
            "sk-test".into(),
            "gpt-3.5-turbo".into(),
            base_url,
            Duration::from_secs(5),
        )
        .expect("client")
    }

    fn request() -> SummarizationRequest {
        SummarizationRequest {
            prompt: "Summarize the invoice".into(),
            max_tokens: 500,
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .body_contains("Summarize the invoice");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "An invoice for 42 EUR." } }]
                }));
            })
            .await;

        let summary = client(server.url("/v1"))
            .generate_summary(request())
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "An invoice for 42 EUR.");
    }

    #[tokio::test]
    async fn insufficient_quota_is_a_quota_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).json_body(json!({
                    "error": { "code": "insufficient_quota", "message": "You exceeded your current quota" }
                }));
            })
            .await;

        let error = client(server.url("/v1"))
            .generate_summary(request())
            .await
            .expect_err("quota");

        assert!(matches!(error, SummarizationClientError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let error = client(server.url("/v1"))
            .generate_summary(request())
            .await
            .expect_err("no content");

        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }
}
