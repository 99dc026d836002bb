//! Chain Workflow Pattern
//!
//! Sequential execution where each step's output feeds the next step's input.

use std::collections::{BTreeMap, HashSet};

use crate::llm::LLMProvider;

use super::execution::{ExecutionTrace, WorkflowError, WorkflowResult};
use super::step::Step;

/// Outputs of a completed chain, in execution order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainOutput {
    /// `(step name, output text)` pairs
    pub steps: Vec<(String, String)>,
}

impl ChainOutput {
    /// Output of the last step
    pub fn final_output(&self) -> Option<&str> {
        self.steps.last().map(|(_, text)| text.as_str())
    }

    /// Output of the named step
    pub fn get(&self, step: &str) -> Option<&str> {
        self.steps
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, text)| text.as_str())
    }
}

/// Chain workflow for sequential LLM operations
///
/// Each step receives the output of the previous step as `{{input}}` and can
/// cite any earlier step by name. Every step runs exactly once, in order; the
/// first failure aborts the chain.
pub struct Chain {
    /// Chain name
    name: String,
    /// Steps in execution order
    steps: Vec<Step>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("name", &self.name)
            .field("step_count", &self.steps.len())
            .finish()
    }
}

impl Chain {
    /// Create a new chain builder
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    /// Get the chain name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn validate(&self) -> WorkflowResult<()> {
        if self.steps.is_empty() {
            return Err(WorkflowError::InvalidConfig(format!(
                "Chain '{}' has no steps",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.name == "input" || !seen.insert(step.name.as_str()) {
                return Err(WorkflowError::InvalidConfig(format!(
                    "Chain '{}' has a duplicate or reserved step name '{}'",
                    self.name, step.name
                )));
            }
        }
        Ok(())
    }

    /// Execute the chain with the given input
    pub async fn execute(
        &self,
        input: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<(ChainOutput, ExecutionTrace)> {
        self.validate()?;

        let mut trace = ExecutionTrace::new(&self.name);
        let mut outputs = BTreeMap::new();
        let mut chain_output = ChainOutput::default();
        let mut current = input.to_string();

        tracing::info!(chain = %self.name, steps = self.steps.len(), "Starting chain");

        for step in &self.steps {
            let (output, step_trace) = step.execute(&current, &outputs, provider).await?;
            trace.add_step(step_trace);

            outputs.insert(step.name.clone(), output.text.clone());
            chain_output
                .steps
                .push((step.name.clone(), output.text.clone()));
            current = output.text;
        }

        tracing::info!(
            chain = %self.name,
            duration_ms = trace.total_duration_ms,
            "Chain completed"
        );

        Ok((chain_output, trace))
    }

    /// Execute the chain and return only the final output
    pub async fn run(&self, input: &str, provider: &dyn LLMProvider) -> WorkflowResult<String> {
        let (output, _) = self.execute(input, provider).await?;
        Ok(output.final_output().unwrap_or_default().to_string())
    }
}

/// Builder for creating Chain workflows
pub struct ChainBuilder {
    name: String,
    steps: Vec<Step>,
}

impl ChainBuilder {
    /// Create a new chain builder
    pub fn new() -> Self {
        Self {
            name: "chain".to_string(),
            steps: Vec::new(),
        }
    }

    /// Set the chain name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a step to the chain
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Build the chain
    pub fn build(self) -> Chain {
        Chain {
            name: self.name,
            steps: self.steps,
        }
    }
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}
