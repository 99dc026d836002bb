//! Step extraction from a workflow prompt

use crate::error::Result;
use crate::llm::{CallOptions, LLMProvider, complete};

/// Extracts the steps needed to carry out a prompt, using only its knowledge
#[derive(Debug, Clone)]
pub struct ActionPlanningAgent {
    knowledge: String,
    options: CallOptions,
}

impl ActionPlanningAgent {
    pub fn new(knowledge: impl Into<String>) -> Self {
        Self {
            knowledge: knowledge.into(),
            options: CallOptions::new().with_temperature(0.0),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are an action planning agent. Using your knowledge, you extract from the user prompt \
             the steps requested to complete the action the user is asking for. You return the steps \
             as a list. Only return the steps in your knowledge. Forget any previous context. \
             This is your knowledge: {}",
            self.knowledge
        )
    }

    /// Ask for the steps of `prompt`, one per non-empty line of the reply
    pub async fn extract_steps(
        &self,
        prompt: &str,
        provider: &dyn LLMProvider,
    ) -> Result<Vec<String>> {
        let reply = complete(provider, &self.system_prompt(), prompt, self.options.clone()).await?;

        let steps: Vec<String> = reply
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        tracing::info!(steps = steps.len(), "Extracted workflow steps");
        Ok(steps)
    }
}
