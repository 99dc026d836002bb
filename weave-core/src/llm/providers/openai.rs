//! OpenAI LLM provider implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL, LlmSettings};
use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, WeaveError};
use crate::llm::{
    LLMProvider, LLMRequest, LLMResponse, Message, MessageRole, ModelInfo, ReasoningEffort,
    TokenUsage, Verbosity,
};

/// OpenAI chat-completion provider.
///
/// Works against any endpoint that speaks the OpenAI wire format.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    embedding_model: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4.1-nano", "gpt-4o")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create with a custom base URL (for proxies or compatible APIs).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::new(api_key, model)
        }
    }

    /// Create from settings and an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_settings(settings: &LlmSettings, api_key: impl Into<String>) -> Result<Self> {
        let client = build_client(settings.timeout)?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: settings.model.clone(),
            embedding_model: settings.embedding_model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` - API key (required)
    /// - `OPENAI_MODEL` - Model name (optional, defaults to "gpt-4.1-nano")
    /// - `OPENAI_BASE_URL` - Custom base URL (optional)
    ///
    /// # Errors
    ///
    /// Returns an error if OPENAI_API_KEY is not set.
    pub fn from_env(model: Option<impl Into<String>>) -> Result<Self> {
        let api_key = std::env::var(crate::config::API_KEY_ENV)
            .map_err(|_| WeaveError::MissingCredential(crate::config::API_KEY_ENV.to_string()))?;

        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("OPENAI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::with_base_url(api_key, model, base_url))
    }

    /// Use a different embedding model.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| WeaveError::Http(format!("Failed to send request to OpenAI: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if let Ok(error) = serde_json::from_str::<OpenAIError>(&text) {
            return Err(WeaveError::Api {
                status: error.error.error_type.unwrap_or_else(|| status.to_string()),
                message: error.error.message,
            });
        }

        Err(WeaveError::Api {
            status: status.to_string(),
            message: text,
        })
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| WeaveError::Http(format!("Failed to create HTTP client: {}", e)))
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verbosity: Option<Verbosity>,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessageResponse>,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

fn convert_messages(messages: &[Message]) -> Vec<OpenAIMessage<'_>> {
    messages
        .iter()
        .map(|m| OpenAIMessage {
            role: match m.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            },
            content: &m.content,
        })
        .collect()
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        let body = OpenAIRequest {
            model: &self.model,
            messages: convert_messages(&request.messages),
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            reasoning_effort: request.options.reasoning_effort,
            verbosity: request.options.verbosity,
        };

        let response = self.post("chat/completions", &body).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            WeaveError::MalformedResponse(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let first = openai_response.choices.into_iter().next().ok_or_else(|| {
            WeaveError::MalformedResponse("OpenAI API returned no choices".to_string())
        })?;

        let content = first.message.and_then(|m| m.content).ok_or_else(|| {
            WeaveError::MalformedResponse("OpenAI choice has no message content".to_string())
        })?;

        let usage = openai_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        tracing::debug!(
            model = %self.model,
            completion_len = content.len(),
            "OpenAI completion received"
        );

        Ok(LLMResponse { content, usage })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WeaveError::MalformedResponse("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response = self.post("embeddings", &body).await?;
        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            WeaveError::MalformedResponse(format!("Failed to parse embedding response: {}", e))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(WeaveError::MalformedResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CallOptions;
    use mockito::Matcher;

    fn provider_for(server: &mockito::ServerGuard) -> OpenAIProvider {
        OpenAIProvider::with_base_url("test-key", "gpt-4.1-nano", server.url())
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test-key", "gpt-4o");
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let provider =
            OpenAIProvider::with_base_url("test-key", "gpt-4", "https://proxy.example.com/v1/");
        assert_eq!(provider.base_url(), "https://proxy.example.com/v1");
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = OpenAIProvider::new("sk-very-secret", "gpt-4o");
        assert!(!format!("{:?}", provider).contains("sk-very-secret"));
    }

    #[test]
    fn test_convert_messages() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message {
                role: MessageRole::Assistant,
                content: "Hi there!".to_string(),
            },
        ];

        let converted = convert_messages(&messages);

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
        assert_eq!(converted[2].role, "assistant");
    }

    #[tokio::test]
    async fn test_chat_completion_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4.1-nano",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "You are a petrochemical expert."},
                    {"role": "user", "content": "Analyze the feedstock: WTI"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"content":"Light sweet crude."}},{"message":{"content":"ignored"}}],
                    "usage":{"prompt_tokens":12,"completion_tokens":4,"total_tokens":16}}"#,
            )
            .create_async()
            .await;

        let provider = provider_for(&server);
        let request =
            LLMRequest::with_system_prompt("You are a petrochemical expert.", "Analyze the feedstock: WTI")
                .options(CallOptions::new().with_temperature(0.0));

        let response = provider.generate_request(&request).await.unwrap();

        assert_eq!(response.content, "Light sweet crude.");
        assert_eq!(response.usage.unwrap().total_tokens, 16);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reasoning_options_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "reasoning_effort": "minimal",
                "verbosity": "low"
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let request = LLMRequest::with_system_prompt("sys", "user").options(
            CallOptions::new().with_reasoning(ReasoningEffort::Minimal, Verbosity::Low),
        );

        let response = provider.generate_request(&request).await.unwrap();
        assert_eq!(response.content, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider
            .generate_request(&LLMRequest::from_prompt("hi"))
            .await;

        match result {
            Err(WeaveError::Api { status, message }) => {
                assert_eq!(status, "invalid_request_error");
                assert!(message.contains("Incorrect API key"));
            }
            other => panic!("Expected Api error, got {:?}", other.map(|r| r.content)),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider
            .generate_request(&LLMRequest::from_prompt("hi"))
            .await;

        assert!(matches!(result, Err(WeaveError::Api { ref message, .. }) if message == "bad gateway"));
    }

    #[tokio::test]
    async fn test_no_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider
            .generate_request(&LLMRequest::from_prompt("hi"))
            .await;

        assert!(matches!(result, Err(WeaveError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_null_content_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider
            .generate_request(&LLMRequest::from_prompt("hi"))
            .await;

        assert!(matches!(result, Err(WeaveError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_embeddings_sorted_by_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "text-embedding-3-large",
                "input": ["first", "second"]
            })))
            .with_status(200)
            .with_body(
                r#"{"data":[{"embedding":[0.0,1.0],"index":1},{"embedding":[1.0,0.0],"index":0}]}"#,
            )
            .create_async()
            .await;

        let provider = provider_for(&server);
        let vectors = provider.embed_batch(&["first", "second"]).await.unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_from_settings_uses_configured_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({"model": "gpt-4o-mini"})))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;

        let settings = LlmSettings {
            model: "gpt-4o-mini".to_string(),
            base_url: server.url(),
            ..Default::default()
        };
        let provider = OpenAIProvider::from_settings(&settings, "test-key").unwrap();
        let response = provider
            .generate_request(&LLMRequest::from_prompt("hi"))
            .await
            .unwrap();

        assert_eq!(response.content, "ok");
        mock.assert_async().await;
    }
}
