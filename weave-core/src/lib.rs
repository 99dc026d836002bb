//! # Weave - composable workflow patterns for LLM agents
//!
//! Weave wires single chat-completion calls into larger workflows:
//! - Prompt chaining, where each step's output feeds the next
//! - Label routing, where a classifier picks the handler
//! - Parallel fan-out with a synthesis step over every branch
//! - Evaluator-optimizer loops that retry until an evaluation passes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weave_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = WeaveConfig::load()?;
//!     let provider = LLMProviderFactory::create(&config.llm)?;
//!
//!     let chain = Chain::builder()
//!         .step(Step::llm("outline", "Outline an essay on {{input}}").build())
//!         .step(Step::llm("draft", "Write the essay from this outline:\n{{input}}").build())
//!         .build();
//!
//!     let (output, _trace) = chain.execute("tidal energy", provider.as_ref()).await?;
//!     println!("{}", output.final_output().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **llm**: provider trait, the OpenAI-compatible client and a scripted
//!   provider for offline runs
//! - **workflow**: the patterns and their execution traces
//! - **agents**: persona, knowledge, evaluation, planning and routing agents
//! - **scenarios**: ready-made demos for each pattern
//! - **memory**: markdown memory-entry generator

pub mod agents;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod memory;
pub mod scenarios;
pub mod workflow;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agents::{
        ActionPlanningAgent, Agent, AugmentedPromptAgent, DirectPromptAgent, EvaluationAgent,
        EvaluationResult, FaqAgent, KnowledgeAugmentedPromptAgent, RoutedResponse, RoutingAgent,
    };
    pub use crate::config::{LlmSettings, MemorySettings, WeaveConfig};
    pub use crate::embeddings::{EmbeddingProvider, cosine_similarity};
    pub use crate::error::{Result, WeaveError};
    pub use crate::llm::{
        CallOptions, DisabledProvider, LLMProvider, LLMProviderFactory, LLMRequest, LLMResponse,
        Message, MessageRole, ScriptedProvider, complete,
    };
    pub use crate::memory::{MemoryEntryOptions, create_entry, kebab_case};
    pub use crate::workflow::{
        Attempt, Branch, Chain, ChainOutput, Classification, Classifier, Evaluator,
        EvaluatorOptimizer, ExecutionTrace, Generator, LLMClassifier, LLMEvaluator, LLMGenerator,
        LabelMatch, Optimized, Parallel, ParallelConfig, ParallelOutput, PassCriterion,
        RouteHandler, RouteOutcome, RouteTask, Router, Step, WorkflowError, WorkflowResult,
    };
}
