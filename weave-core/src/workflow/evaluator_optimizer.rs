//! Evaluator-Optimizer Workflow Pattern
//!
//! Bounded generate-evaluate-refine loop. The evaluation text of a failed
//! attempt is handed back to the generator as feedback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::{CallOptions, LLMProvider, LLMRequest};

use super::execution::{WorkflowError, WorkflowResult};
use super::step::render_with;

/// Default attempt ceiling
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Decides whether an evaluation text is a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassCriterion {
    /// Case-insensitive substring anywhere in the evaluation
    Contains(String),
    /// The last `key: value` line whose key matches must carry `expected`
    ///
    /// Both comparisons ignore ASCII case.
    StatusLine { key: String, expected: String },
}

impl Default for PassCriterion {
    fn default() -> Self {
        PassCriterion::Contains("overall status: passed".to_string())
    }
}

impl PassCriterion {
    /// Whether `evaluation` passes
    pub fn is_pass(&self, evaluation: &str) -> bool {
        match self {
            PassCriterion::Contains(needle) => evaluation
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            PassCriterion::StatusLine { key, expected } => evaluation
                .lines()
                .filter_map(|line| line.trim().split_once(':'))
                .filter(|(k, _)| k.trim().eq_ignore_ascii_case(key))
                .last()
                .is_some_and(|(_, value)| value.trim().eq_ignore_ascii_case(expected)),
        }
    }
}

/// Trait for content generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate content from input, with feedback from the previous attempt
    async fn generate(
        &self,
        input: &str,
        feedback: Option<&str>,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<String>;
}

/// Trait for content evaluation
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate generated content and return the critique text
    async fn evaluate(
        &self,
        input: &str,
        output: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<String>;
}

/// LLM-based generator
///
/// The prompt template sees `{{input}}` and `{{feedback}}`. On a retry
/// `{{feedback}}` becomes the rendered feedback template; on the first
/// attempt it becomes the first-attempt note.
pub struct LLMGenerator {
    system_prompt: String,
    prompt_template: String,
    feedback_template: String,
    first_attempt_note: String,
    options: CallOptions,
}

impl LLMGenerator {
    /// Create a new LLM generator
    pub fn new(system_prompt: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt_template: prompt_template.into(),
            feedback_template:
                "\n\nPrevious attempt feedback:\n{{feedback}}\n\nPlease improve based on this feedback."
                    .to_string(),
            first_attempt_note: String::new(),
            options: CallOptions::default(),
        }
    }

    /// Template for the feedback block (`{{feedback}}` is the evaluation)
    pub fn with_feedback_template(mut self, template: impl Into<String>) -> Self {
        self.feedback_template = template.into();
        self
    }

    /// Text used in place of feedback on the first attempt
    pub fn with_first_attempt_note(mut self, note: impl Into<String>) -> Self {
        self.first_attempt_note = note.into();
        self
    }

    /// Replace the sampling options
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    fn render(&self, input: &str, feedback: Option<&str>) -> String {
        let section = match feedback {
            Some(feedback) => render_with(&self.feedback_template, |key| {
                (key == "feedback").then_some(feedback)
            }),
            None => self.first_attempt_note.clone(),
        };
        let prompt = render_with(&self.prompt_template, |key| match key {
            "input" => Some(input),
            "feedback" => Some(section.as_str()),
            _ => None,
        });
        if self.prompt_template.contains("{{feedback}}") {
            prompt
        } else {
            prompt + &section
        }
    }
}

#[async_trait]
impl Generator for LLMGenerator {
    async fn generate(
        &self,
        input: &str,
        feedback: Option<&str>,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<String> {
        let request = LLMRequest::with_system_prompt(&self.system_prompt, self.render(input, feedback))
            .options(self.options.clone());
        let response = provider.generate_request(&request).await?;
        Ok(response.content)
    }
}

/// LLM-based evaluator
///
/// The prompt template sees `{{input}}` and `{{output}}`.
pub struct LLMEvaluator {
    system_prompt: String,
    prompt_template: String,
    options: CallOptions,
}

impl LLMEvaluator {
    /// Create a new LLM evaluator
    pub fn new(system_prompt: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt_template: prompt_template.into(),
            options: CallOptions::new().with_temperature(0.0),
        }
    }

    /// Replace the sampling options
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl Evaluator for LLMEvaluator {
    async fn evaluate(
        &self,
        input: &str,
        output: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<String> {
        let prompt = render_with(&self.prompt_template, |key| match key {
            "input" => Some(input),
            "output" => Some(output),
            _ => None,
        });
        let request =
            LLMRequest::with_system_prompt(&self.system_prompt, prompt).options(self.options.clone());
        let response = provider.generate_request(&request).await?;
        Ok(response.content)
    }
}

/// Configuration for evaluator-optimizer
#[derive(Debug, Clone)]
pub struct EvaluatorOptimizerConfig {
    /// Maximum generate-evaluate rounds
    pub max_iterations: usize,
    /// Pass decision over the evaluation text
    pub pass_criterion: PassCriterion,
}

impl Default for EvaluatorOptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            pass_criterion: PassCriterion::default(),
        }
    }
}

/// Attempt record
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// Attempt number (1-indexed)
    pub iteration: usize,
    /// Generated output
    pub output: String,
    /// Evaluation text
    pub evaluation: String,
    /// Whether this attempt passed
    pub passed: bool,
}

/// Final result of the loop
///
/// Exhausting the ceiling is not an error: the last attempt is returned with
/// `passed = false`.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    /// Output of the last attempt
    pub output: String,
    /// Evaluation of the last attempt
    pub evaluation: String,
    /// Whether the last attempt passed
    pub passed: bool,
    /// Number of attempts made
    pub iterations: usize,
}

/// Execution trace
#[derive(Debug, Clone)]
pub struct EvaluatorOptimizerTrace {
    /// Workflow name
    pub name: String,
    /// All attempts
    pub attempts: Vec<Attempt>,
    /// Total duration
    pub total_duration_ms: u64,
}

/// Evaluator-Optimizer workflow
pub struct EvaluatorOptimizer<G: Generator, E: Evaluator> {
    /// Workflow name
    name: String,
    /// Generator
    generator: G,
    /// Evaluator
    evaluator: E,
    /// Configuration
    config: EvaluatorOptimizerConfig,
}

impl<G: Generator, E: Evaluator> std::fmt::Debug for EvaluatorOptimizer<G, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorOptimizer")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

impl<G: Generator, E: Evaluator> EvaluatorOptimizer<G, E> {
    /// Create a new evaluator-optimizer builder
    pub fn builder(generator: G, evaluator: E) -> EvaluatorOptimizerBuilder<G, E> {
        EvaluatorOptimizerBuilder::new(generator, evaluator)
    }

    /// Get the workflow name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the generate-evaluate-refine loop
    pub async fn execute(
        &self,
        input: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<(Optimized, EvaluatorOptimizerTrace)> {
        if self.config.max_iterations == 0 {
            return Err(WorkflowError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let start = std::time::Instant::now();
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut feedback: Option<String> = None;

        for iteration in 1..=self.config.max_iterations {
            tracing::info!(
                workflow = %self.name,
                attempt = iteration,
                max = self.config.max_iterations,
                "Generating attempt"
            );

            let output = self
                .generator
                .generate(input, feedback.as_deref(), provider)
                .await?;
            let evaluation = self.evaluator.evaluate(input, &output, provider).await?;
            let passed = self.config.pass_criterion.is_pass(&evaluation);

            attempts.push(Attempt {
                iteration,
                output,
                evaluation: evaluation.clone(),
                passed,
            });

            if passed {
                tracing::info!(workflow = %self.name, attempt = iteration, "Attempt passed");
                break;
            }

            tracing::info!(
                workflow = %self.name,
                attempt = iteration,
                "Attempt needs revision, relaying feedback"
            );
            feedback = Some(evaluation);
        }

        let trace = EvaluatorOptimizerTrace {
            name: self.name.clone(),
            attempts,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        let last = trace
            .attempts
            .last()
            .ok_or_else(|| WorkflowError::InvalidConfig("no attempts were made".to_string()))?;

        if !last.passed {
            tracing::warn!(
                workflow = %self.name,
                attempts = trace.attempts.len(),
                "Failed to pass evaluation within the attempt ceiling"
            );
        }

        let optimized = Optimized {
            output: last.output.clone(),
            evaluation: last.evaluation.clone(),
            passed: last.passed,
            iterations: last.iteration,
        };

        Ok((optimized, trace))
    }
}

/// Builder for EvaluatorOptimizer
pub struct EvaluatorOptimizerBuilder<G: Generator, E: Evaluator> {
    name: String,
    generator: G,
    evaluator: E,
    config: EvaluatorOptimizerConfig,
}

impl<G: Generator, E: Evaluator> EvaluatorOptimizerBuilder<G, E> {
    /// Create a new builder
    pub fn new(generator: G, evaluator: E) -> Self {
        Self {
            name: "evaluator-optimizer".to_string(),
            generator,
            evaluator,
            config: EvaluatorOptimizerConfig::default(),
        }
    }

    /// Set the workflow name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set maximum iterations
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Set the pass criterion
    pub fn pass_criterion(mut self, criterion: PassCriterion) -> Self {
        self.config.pass_criterion = criterion;
        self
    }

    /// Build the workflow
    pub fn build(self) -> EvaluatorOptimizer<G, E> {
        EvaluatorOptimizer {
            name: self.name,
            generator: self.generator,
            evaluator: self.evaluator,
            config: self.config,
        }
    }
}
