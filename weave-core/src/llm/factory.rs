//! Factory for creating LLM providers from configuration

use std::sync::Arc;

use crate::config::{LlmSettings, ProviderKind};
use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, WeaveError};
use crate::llm::providers::openai::OpenAIProvider;
use crate::llm::{DisabledProvider, LLMProvider};

/// Factory for creating LLM providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration.
    ///
    /// When no API key is configured a [`DisabledProvider`] is returned so
    /// callers that can degrade (the FAQ agent) still run.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn create(settings: &LlmSettings) -> Result<Arc<dyn LLMProvider>> {
        match settings.provider {
            ProviderKind::OpenAI => match &settings.api_key {
                Some(api_key) => {
                    tracing::info!(
                        model = %settings.model,
                        base_url = %settings.base_url,
                        "Using OpenAI provider"
                    );
                    Ok(Arc::new(OpenAIProvider::from_settings(settings, api_key)?))
                }
                None => {
                    tracing::warn!(
                        env = crate::config::API_KEY_ENV,
                        "No API key configured, LLM calls are disabled"
                    );
                    Ok(Arc::new(DisabledProvider))
                }
            },
        }
    }

    /// Create an embedding provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::MissingCredential`] when no API key is configured.
    pub fn create_embeddings(settings: &LlmSettings) -> Result<Arc<dyn EmbeddingProvider>> {
        match settings.provider {
            ProviderKind::OpenAI => {
                let api_key = settings.api_key.as_ref().ok_or_else(|| {
                    WeaveError::MissingCredential(crate::config::API_KEY_ENV.to_string())
                })?;
                Ok(Arc::new(OpenAIProvider::from_settings(settings, api_key)?))
            }
        }
    }
}
