use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaveError};

/// Sampling options for a single call.
///
/// Reasoning models reject `temperature` and take `reasoning_effort` and
/// `verbosity` instead, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    /// Temperature for generation (0.0-2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,

    /// Reasoning effort for reasoning models
    pub reasoning_effort: Option<ReasoningEffort>,

    /// Output verbosity for reasoning models
    pub verbosity: Option<Verbosity>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_reasoning(mut self, effort: ReasoningEffort, verbosity: Verbosity) -> Self {
        self.reasoning_effort = Some(effort);
        self.verbosity = Some(verbosity);
        self
    }
}

/// Reasoning effort hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

/// Response length hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    Medium,
    High,
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request to an LLM provider
#[derive(Debug, Clone, PartialEq)]
pub struct LLMRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,

    /// Sampling options
    pub options: CallOptions,
}

impl LLMRequest {
    /// Create a simple request from a single prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            options: CallOptions::default(),
        }
    }

    /// Create a request with system prompt
    pub fn with_system_prompt(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
            options: CallOptions::default(),
        }
    }

    /// Replace the sampling options
    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Content of the system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
    }

    /// Content of the last user message
    pub fn user_prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Text of the first choice
    pub content: String,

    /// Token usage information
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Trait for LLM provider implementations.
///
/// Every workflow pattern takes a provider by reference, so tests substitute
/// a [`ScriptedProvider`] without touching process-wide state.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat-completion request and return the first choice.
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Single-call helper: send a system/user pair and return the reply text.
///
/// Any provider failure (network, auth, malformed response) is returned as-is.
pub async fn complete(
    provider: &dyn LLMProvider,
    system_prompt: &str,
    user_prompt: &str,
    options: CallOptions,
) -> Result<String> {
    let request = LLMRequest::with_system_prompt(system_prompt, user_prompt).options(options);
    tracing::debug!(
        model = %provider.model_info().model_name,
        system_len = system_prompt.len(),
        user_len = user_prompt.len(),
        "Sending chat completion"
    );
    let response = provider.generate_request(&request).await?;
    Ok(response.content)
}

/// Provider used when no API credential is configured.
///
/// Every call fails with [`WeaveError::MissingCredential`], which lets callers
/// substitute a placeholder answer instead of crashing.
#[derive(Debug, Default)]
pub struct DisabledProvider;

#[async_trait]
impl LLMProvider for DisabledProvider {
    async fn generate_request(&self, _request: &LLMRequest) -> Result<LLMResponse> {
        Err(WeaveError::MissingCredential(
            crate::config::API_KEY_ENV.to_string(),
        ))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "disabled".to_string(),
            model_name: "none".to_string(),
        }
    }
}

pub mod factory;
pub mod providers;
pub mod scripted;

pub use factory::LLMProviderFactory;
pub use scripted::ScriptedProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_options() {
        let options = CallOptions::new()
            .with_temperature(0.2)
            .with_max_tokens(1000)
            .with_reasoning(ReasoningEffort::Minimal, Verbosity::Low);

        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, Some(1000));
        assert_eq!(options.reasoning_effort, Some(ReasoningEffort::Minimal));
        assert_eq!(options.verbosity, Some(Verbosity::Low));
    }

    #[test]
    fn test_temperature_clamping() {
        let options = CallOptions::new().with_temperature(5.0);
        assert_eq!(options.temperature, Some(2.0));

        let options = CallOptions::new().with_temperature(-1.0);
        assert_eq!(options.temperature, Some(0.0));
    }

    #[test]
    fn test_request_accessors() {
        let request = LLMRequest::with_system_prompt("be brief", "hello");
        assert_eq!(request.system_prompt(), Some("be brief"));
        assert_eq!(request.user_prompt(), "hello");

        let request = LLMRequest::from_prompt("only user");
        assert_eq!(request.system_prompt(), None);
        assert_eq!(request.user_prompt(), "only user");
    }

    #[tokio::test]
    async fn test_disabled_provider() {
        let result = complete(&DisabledProvider, "sys", "user", CallOptions::default()).await;
        assert!(matches!(result, Err(WeaveError::MissingCredential(_))));
    }

    #[tokio::test]
    async fn test_complete_sends_system_and_user() {
        let provider = ScriptedProvider::new(vec!["reply"]);
        let text = complete(
            &provider,
            "You are an expert.",
            "What is a sprint?",
            CallOptions::new().with_temperature(0.0),
        )
        .await
        .unwrap();

        assert_eq!(text, "reply");
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_prompt(), Some("You are an expert."));
        assert_eq!(requests[0].user_prompt(), "What is a sprint?");
        assert_eq!(requests[0].options.temperature, Some(0.0));
    }
}
