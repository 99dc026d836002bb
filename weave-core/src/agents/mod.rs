//! Reusable agent kinds
//!
//! An agent pairs a role description with one or more calls to an LLM. All
//! agents take the provider by reference so the same agent can run against
//! the live API or a [`ScriptedProvider`](crate::llm::ScriptedProvider).

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::LLMProvider;

mod evaluation;
mod faq;
mod planning;
mod prompt;
mod routing;

pub use evaluation::{EvaluationAgent, EvaluationResult};
pub use faq::{FaqAgent, LLM_ERROR_PREFIX, MISSING_KEY_MESSAGE, UNKNOWN_QUESTION_ANSWER};
pub use planning::ActionPlanningAgent;
pub use prompt::{AugmentedPromptAgent, DirectPromptAgent, KnowledgeAugmentedPromptAgent};
pub use routing::{AgentRoute, RoutedResponse, RoutingAgent};

/// An agent that answers a prompt
#[async_trait]
pub trait Agent: Send + Sync {
    /// Respond to `prompt`
    async fn respond(&self, prompt: &str, provider: &dyn LLMProvider) -> Result<String>;
}
