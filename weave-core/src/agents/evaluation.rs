//! Worker/evaluator correction loop

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Result, WeaveError};
use crate::llm::{CallOptions, LLMProvider, complete};
use crate::workflow::PassCriterion;

use super::Agent;

/// Outcome of an evaluation loop
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    /// Last worker response
    pub final_response: String,
    /// Last evaluation text
    pub evaluation: String,
    /// Rounds run
    pub iterations: usize,
    /// Whether the last evaluation passed
    pub passed: bool,
}

/// Checks a worker's answers against criteria and asks for corrections
///
/// Each round: the worker responds, the evaluator judges the response, and
/// on a failing verdict the evaluator writes correction instructions that
/// become the worker's next prompt.
pub struct EvaluationAgent {
    persona: String,
    criteria: String,
    worker: Arc<dyn Agent>,
    max_interactions: usize,
    pass_criterion: PassCriterion,
    options: CallOptions,
}

impl std::fmt::Debug for EvaluationAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationAgent")
            .field("persona", &self.persona)
            .field("criteria", &self.criteria)
            .field("max_interactions", &self.max_interactions)
            .finish()
    }
}

impl EvaluationAgent {
    pub fn new(
        persona: impl Into<String>,
        criteria: impl Into<String>,
        worker: Arc<dyn Agent>,
        max_interactions: usize,
    ) -> Self {
        Self {
            persona: persona.into(),
            criteria: criteria.into(),
            worker,
            max_interactions,
            pass_criterion: PassCriterion::Contains("yes".to_string()),
            options: CallOptions::new().with_temperature(0.0),
        }
    }

    /// Override how a verdict is judged as passing
    pub fn with_pass_criterion(mut self, criterion: PassCriterion) -> Self {
        self.pass_criterion = criterion;
        self
    }

    fn system_prompt(&self) -> String {
        format!("You are {}. Forget all previous context.", self.persona)
    }

    /// Run the correction loop starting from `initial_prompt`
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `max_interactions` is zero, or the
    /// first provider failure.
    pub async fn evaluate(
        &self,
        initial_prompt: &str,
        provider: &dyn LLMProvider,
    ) -> Result<EvaluationResult> {
        if self.max_interactions == 0 {
            return Err(WeaveError::Configuration(
                "max_interactions must be at least 1".to_string(),
            ));
        }

        let system = self.system_prompt();
        let mut prompt = initial_prompt.to_string();
        let mut result = EvaluationResult {
            final_response: String::new(),
            evaluation: String::new(),
            iterations: 0,
            passed: false,
        };

        for iteration in 1..=self.max_interactions {
            tracing::debug!(persona = %self.persona, iteration, "Evaluation round");

            let response = self.worker.respond(&prompt, provider).await?;

            let judge_prompt = format!(
                "Does the following answer: {}\n Meet this criteria: {}\n\
                 Respond Yes or No, and the reason why it does or doesn't meet the criteria.",
                response, self.criteria
            );
            let evaluation = complete(provider, &system, &judge_prompt, self.options.clone()).await?;
            let passed = self.pass_criterion.is_pass(&evaluation);

            result = EvaluationResult {
                final_response: response,
                evaluation,
                iterations: iteration,
                passed,
            };

            if passed {
                tracing::info!(persona = %self.persona, iteration, "Final solution accepted");
                break;
            }

            if iteration == self.max_interactions {
                break;
            }

            let instruction_prompt = format!(
                "Provide instructions to fix an answer based on these reasons why it is incorrect: {}",
                result.evaluation
            );
            let instructions =
                complete(provider, &system, &instruction_prompt, self.options.clone()).await?;

            prompt = format!(
                "The original prompt was: {}\nThe response to that prompt was: {}\n\
                 It has been evaluated as incorrect.\n\
                 Make only these corrections, do not alter content validity: {}",
                initial_prompt, result.final_response, instructions
            );
        }

        if !result.passed {
            tracing::warn!(
                persona = %self.persona,
                iterations = result.iterations,
                "Returning last response without an accepting evaluation"
            );
        }

        Ok(result)
    }
}

#[async_trait]
impl Agent for EvaluationAgent {
    async fn respond(&self, prompt: &str, provider: &dyn LLMProvider) -> Result<String> {
        Ok(self.evaluate(prompt, provider).await?.final_response)
    }
}
