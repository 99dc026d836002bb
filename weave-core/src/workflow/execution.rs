//! Workflow execution types and error handling

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::error::WeaveError;
use crate::llm::TokenUsage;

/// Error type for workflow operations
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Step execution failed
    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    /// LLM provider error
    #[error("LLM error: {0}")]
    LLMError(#[from] WeaveError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Workflow timeout
    #[error("Workflow timed out after {0:?}")]
    Timeout(Duration),

    /// A parallel branch failed
    #[error("Branch '{branch}' failed: {message}")]
    BranchFailed { branch: String, message: String },
}

impl WorkflowError {
    /// The underlying provider error, if this failure came from the LLM.
    pub fn as_llm_error(&self) -> Option<&WeaveError> {
        match self {
            WorkflowError::LLMError(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Trace of a single step execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTrace {
    /// Step name
    pub step_name: String,

    /// Rendered prompt sent to the step
    pub input: String,

    /// Step output text
    pub output: Option<String>,

    /// Duration of step execution
    pub duration_ms: u64,

    /// Whether the step succeeded
    pub success: bool,

    /// Error message if failed
    pub error: Option<String>,

    /// Token usage if available
    pub token_usage: Option<TokenUsageTrace>,
}

/// Token usage trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsageTrace {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl From<TokenUsage> for TokenUsageTrace {
    fn from(usage: TokenUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

impl StepTrace {
    /// Create a successful step trace
    pub fn success(
        step_name: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            input: input.into(),
            output: Some(output.into()),
            duration_ms,
            success: true,
            error: None,
            token_usage: None,
        }
    }

    /// Create a failed step trace
    pub fn failure(
        step_name: impl Into<String>,
        input: impl Into<String>,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            input: input.into(),
            output: None,
            duration_ms,
            success: false,
            error: Some(error.into()),
            token_usage: None,
        }
    }

    /// Add token usage to the trace
    pub fn with_token_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.token_usage = usage.map(TokenUsageTrace::from);
        self
    }
}

/// Complete execution trace for a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// Workflow name
    pub workflow_name: String,

    /// Step traces in execution order
    pub steps: Vec<StepTrace>,

    /// Total duration
    pub total_duration_ms: u64,

    /// Whether the workflow completed successfully
    pub success: bool,

    /// Final error if failed
    pub error: Option<String>,
}

impl ExecutionTrace {
    /// Create a new execution trace
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            steps: Vec::new(),
            total_duration_ms: 0,
            success: true,
            error: None,
        }
    }

    /// Add a step trace
    pub fn add_step(&mut self, step: StepTrace) {
        self.total_duration_ms += step.duration_ms;
        if !step.success {
            self.success = false;
            self.error = step.error.clone();
        }
        self.steps.push(step);
    }

    /// Get total token usage across all steps
    pub fn total_token_usage(&self) -> Option<TokenUsageTrace> {
        let mut total = TokenUsageTrace::default();

        let mut has_usage = false;
        for usage in self.steps.iter().filter_map(|s| s.token_usage.as_ref()) {
            total.prompt_tokens += usage.prompt_tokens;
            total.completion_tokens += usage.completion_tokens;
            total.total_tokens += usage.total_tokens;
            has_usage = true;
        }

        has_usage.then_some(total)
    }

    /// Get the number of completed steps
    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_trace_failure() {
        let trace = StepTrace::failure("feedstock", "prompt", "Something went wrong", 50);

        assert!(!trace.success);
        assert!(trace.output.is_none());
        assert_eq!(trace.error.as_deref(), Some("Something went wrong"));
    }

    #[test]
    fn test_execution_trace_totals() {
        let mut trace = ExecutionTrace::new("refinery");

        trace.add_step(StepTrace::success("step1", "in", "out", 100));
        trace.add_step(StepTrace::success("step2", "out", "more", 150).with_token_usage(Some(
            TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
        )));

        assert!(trace.success);
        assert_eq!(trace.completed_steps(), 2);
        assert_eq!(trace.total_duration_ms, 250);
        assert_eq!(trace.total_token_usage().unwrap().total_tokens, 150);
    }

    #[test]
    fn test_execution_trace_failure() {
        let mut trace = ExecutionTrace::new("refinery");
        trace.add_step(StepTrace::success("step1", "in", "out", 100));
        trace.add_step(StepTrace::failure("step2", "out", "Error occurred", 50));

        assert!(!trace.success);
        assert_eq!(trace.completed_steps(), 1);
        assert!(trace.total_token_usage().is_none());
    }

    #[test]
    fn test_llm_error_is_reachable() {
        let err = WorkflowError::from(WeaveError::MissingCredential("OPENAI_API_KEY".into()));
        assert!(matches!(
            err.as_llm_error(),
            Some(WeaveError::MissingCredential(_))
        ));
    }
}
