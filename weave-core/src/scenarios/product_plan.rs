//! Product planning workflow
//!
//! An action-planning agent breaks the workflow prompt into steps; each step
//! is routed by embedding similarity to a Product Manager, Program Manager or
//! Development Engineer. Every role is a knowledge agent checked by an
//! evaluation agent.

use std::path::Path;
use std::sync::Arc;

use crate::agents::{
    ActionPlanningAgent, EvaluationAgent, KnowledgeAugmentedPromptAgent, RoutedResponse,
    RoutingAgent,
};
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::llm::LLMProvider;

/// Product spec read when no path is given
pub const DEFAULT_SPEC_PATH: &str = "Product-Spec-Email-Router.txt";

/// Prompt the plan is derived from
pub const WORKFLOW_PROMPT: &str = "What would the development tasks for this product be?";

/// Correction rounds each role gets
pub const MAX_INTERACTIONS: usize = 10;

/// Output reported when planning yields no steps
pub const NO_STEPS_MESSAGE: &str = "No steps were completed.";

pub const PRODUCT_MANAGER: &str = "Product Manager";
pub const PROGRAM_MANAGER: &str = "Program Manager";
pub const DEVELOPMENT_ENGINEER: &str = "Development Engineer";

const PLANNING_KNOWLEDGE: &str = "Stories are defined from a product spec by identifying a \
persona, an action, and a desired outcome for each story. \
Each story represents a specific functionality of the product \
described in the specification. \n\
Features are defined by grouping related user stories. \n\
Tasks are defined for each story and represent the engineering \
work required to develop the product. \n\
A development Plan for a product contains all these components";

const EVALUATOR_PERSONA: &str = "an evaluation agent that checks the answers of other worker agents";

const STORY_CRITERIA: &str = "The answer should be stories that follow the following structure: \
As a [type of user], I want [an action or feature] so that [benefit/value].";

const FEATURE_CRITERIA: &str = "The answer should be product features that follow the following structure: \
Feature Name: A clear, concise title that identifies the capability\n\
Description: A brief explanation of what the feature does and its purpose\n\
Key Functionality: The specific capabilities or actions the feature provides\n\
User Benefit: How this feature creates value for the user";

const TASK_CRITERIA: &str = "The answer should be tasks following this exact structure: \
Task ID: A unique identifier for tracking purposes\n\
Task Title: Brief description of the specific development work\n\
Related User Story: Reference to the parent user story\n\
Description: Detailed explanation of the technical work required\n\
Acceptance Criteria: Specific requirements that must be met for completion\n\
Estimated Effort: Time or complexity estimation\n\
Dependencies: Any tasks that must be completed first";

/// Read the product spec from `path`
pub fn load_spec(path: impl AsRef<Path>) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

fn role(persona: &str, knowledge: String, criteria: &str) -> Arc<EvaluationAgent> {
    let worker = Arc::new(KnowledgeAugmentedPromptAgent::new(persona, knowledge));
    Arc::new(EvaluationAgent::new(
        EVALUATOR_PERSONA,
        criteria,
        worker,
        MAX_INTERACTIONS,
    ))
}

/// Build the role router for `product_spec`
pub fn router(product_spec: &str) -> RoutingAgent {
    RoutingAgent::new()
        .route(
            PRODUCT_MANAGER,
            "Responsible for defining product personas and user stories only. \
             Does not define features or tasks. Does not group stories.",
            role(
                "a Product Manager, you are responsible for defining the user stories for a product.",
                format!(
                    "Stories are defined by writing sentences with a persona, an action, and a desired outcome. \
                     The sentences always start with: As a \
                     Write several stories for the product spec below, where the personas are the \
                     different users of the product. {}",
                    product_spec
                ),
                STORY_CRITERIA,
            ),
        )
        .route(
            PROGRAM_MANAGER,
            "Responsible for defining product features by grouping related user stories. \
             Does not define user stories or engineering tasks.",
            role(
                "a Program Manager, you are responsible for defining the features for a product.",
                "Features of a product are defined by organizing similar user stories into cohesive groups."
                    .to_string(),
                FEATURE_CRITERIA,
            ),
        )
        .route(
            DEVELOPMENT_ENGINEER,
            "Responsible for defining detailed engineering and development tasks for each user story. \
             Does not define user stories or features.",
            role(
                "a Development Engineer, you are responsible for defining the development tasks for a product.",
                "Development tasks are defined by identifying what needs to be built to implement each user story."
                    .to_string(),
                TASK_CRITERIA,
            ),
        )
}

/// A planned step and the routed answer to it
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedStep {
    pub step: String,
    pub routed: RoutedResponse,
}

/// Every completed step, in plan order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPlan {
    pub steps: Vec<CompletedStep>,
}

impl ProductPlan {
    /// Response to the last step, or [`NO_STEPS_MESSAGE`]
    pub fn final_output(&self) -> &str {
        self.steps
            .last()
            .map(|s| s.routed.response.as_str())
            .unwrap_or(NO_STEPS_MESSAGE)
    }
}

/// Plan `prompt` against `product_spec` and answer every step
pub async fn run(
    product_spec: &str,
    prompt: &str,
    provider: &dyn LLMProvider,
    embeddings: &dyn EmbeddingProvider,
) -> Result<ProductPlan> {
    let planner = ActionPlanningAgent::new(PLANNING_KNOWLEDGE);
    let router = router(product_spec);

    tracing::info!(prompt, "Defining workflow steps");
    let steps = planner.extract_steps(prompt, provider).await?;

    let mut plan = ProductPlan::default();
    for step in steps {
        tracing::info!(step = %step, "Processing step");
        let routed = router.dispatch(&step, embeddings, provider).await?;
        plan.steps.push(CompletedStep { step, routed });
    }

    Ok(plan)
}
