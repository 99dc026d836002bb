//! Workflow Patterns for LLM Agent Execution
//!
//! This module provides structured execution patterns for LLM agents:
//!
//! - **Chain**: Sequential steps where each output feeds the next input
//! - **Router**: Directs input to specialized handlers based on classification
//! - **Parallel**: Fans out to concurrent branches, then synthesizes
//! - **Evaluator-Optimizer**: Iteratively refines output based on evaluation
//!
//! # Example
//!
//! ```rust,ignore
//! use weave_core::workflow::{Chain, LLMClassifier, Router, Step};
//!
//! // Chain example
//! let chain = Chain::builder()
//!     .step(Step::llm("summarize", summarize_prompt).build())
//!     .step(Step::llm("translate", "Translate: {{input}}").build())
//!     .build();
//!
//! let (output, trace) = chain.execute(input, &provider).await?;
//!
//! // Router example
//! let router = Router::builder()
//!     .step_route("greeting", Step::llm("greet", "{{input}}").build())
//!     .step_route("question", Step::llm("answer", "{{input}}").build())
//!     .build();
//!
//! let classifier = LLMClassifier::new(vec!["greeting", "question"]);
//! let (outcome, trace) = router.execute(input, &classifier, &provider).await?;
//! ```
//!
//! # References
//!
//! - [Anthropic Building Effective Agents](https://www.anthropic.com/research/building-effective-agents)

mod chain;
mod classifier;
mod evaluator_optimizer;
mod execution;
mod parallel;
mod router;
mod step;

pub use chain::{Chain, ChainBuilder, ChainOutput};
pub use classifier::{Classification, Classifier, LLMClassifier, LabelMatch};
pub use evaluator_optimizer::{
    Attempt, DEFAULT_MAX_ITERATIONS, Evaluator, EvaluatorOptimizer, EvaluatorOptimizerBuilder,
    EvaluatorOptimizerConfig, EvaluatorOptimizerTrace, Generator, LLMEvaluator, LLMGenerator,
    Optimized, PassCriterion,
};
pub use execution::{ExecutionTrace, StepTrace, TokenUsageTrace, WorkflowError, WorkflowResult};
pub use parallel::{
    Branch, BranchTrace, Parallel, ParallelBuilder, ParallelConfig, ParallelExecutionTrace,
    ParallelOutput,
};
pub use router::{
    DEFAULT_FALLBACK_MESSAGE, Fallback, RouteHandler, RouteOutcome, RouteTask, Router,
    RouterBuilder, RouterExecutionTrace,
};
pub use step::{Step, StepBuilder, StepOutput, StepType, render_template, render_with};
