//! Single-call prompt agents

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::{CallOptions, LLMProvider, LLMRequest, complete};

use super::Agent;

/// Sends the prompt as-is, with no system message
#[derive(Debug, Clone)]
pub struct DirectPromptAgent {
    options: CallOptions,
}

impl DirectPromptAgent {
    pub fn new() -> Self {
        Self {
            options: CallOptions::new().with_temperature(0.0),
        }
    }

    /// Replace the sampling options
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for DirectPromptAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for DirectPromptAgent {
    async fn respond(&self, prompt: &str, provider: &dyn LLMProvider) -> Result<String> {
        let request = LLMRequest::from_prompt(prompt).options(self.options.clone());
        Ok(provider.generate_request(&request).await?.content)
    }
}

/// Answers in the voice of a persona
#[derive(Debug, Clone)]
pub struct AugmentedPromptAgent {
    persona: String,
    options: CallOptions,
}

impl AugmentedPromptAgent {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            options: CallOptions::new().with_temperature(0.0),
        }
    }

    /// The system prompt this agent sends
    pub fn system_prompt(&self) -> String {
        format!("You are {}. Forget all previous context.", self.persona)
    }
}

#[async_trait]
impl Agent for AugmentedPromptAgent {
    async fn respond(&self, prompt: &str, provider: &dyn LLMProvider) -> Result<String> {
        complete(provider, &self.system_prompt(), prompt, self.options.clone()).await
    }
}

/// Answers in the voice of a persona, using only the supplied knowledge
#[derive(Debug, Clone)]
pub struct KnowledgeAugmentedPromptAgent {
    persona: String,
    knowledge: String,
    options: CallOptions,
}

impl KnowledgeAugmentedPromptAgent {
    pub fn new(persona: impl Into<String>, knowledge: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            knowledge: knowledge.into(),
            options: CallOptions::new().with_temperature(0.0),
        }
    }

    /// The system prompt this agent sends
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {} knowledge-based assistant. Forget all previous context. \
             Use only the following knowledge to answer, do not use your own knowledge: {} \
             Answer the prompt based on this knowledge, not your own.",
            self.persona, self.knowledge
        )
    }
}

#[async_trait]
impl Agent for KnowledgeAugmentedPromptAgent {
    async fn respond(&self, prompt: &str, provider: &dyn LLMProvider) -> Result<String> {
        complete(provider, &self.system_prompt(), prompt, self.options.clone()).await
    }
}
