//! Refinery planning chain: feedstock analysis through production recommendation

use crate::llm::LLMProvider;
use crate::workflow::{Chain, ChainOutput, ExecutionTrace, Step, WorkflowResult};

/// Feedstock used when none is given
pub const DEFAULT_FEEDSTOCK: &str = "West Texas Intermediate Crude";

/// Step names, in execution order
pub const STAGES: [&str; 4] = [
    "feedstock_analysis",
    "distillation_plan",
    "market_analysis",
    "production_recommendation",
];

/// Build the four-stage refinery chain
pub fn chain() -> Chain {
    Chain::builder()
        .name("refinery")
        .step(
            Step::llm(STAGES[0], "Analyze the feedstock: {{input}}")
                .system_prompt(
                    "You are a petrochemical expert analyzing hydrocarbon feedstocks. \
                     Provide a concise analysis of the given feedstock, highlighting its key components \
                     and general suitability for producing valuable refined products like gasoline, \
                     diesel, and kerosene.",
                )
                .temperature(0.0)
                .build(),
        )
        .step(
            Step::llm(
                STAGES[1],
                "Based on the following feedstock analysis, estimate potential distillation yields:\n{{input}}",
            )
            .system_prompt(
                "You are a refinery distillation tower operations planner. \
                 Based on the provided feedstock analysis, estimate the potential percentage yields \
                 for major products like gasoline, diesel, and kerosene. Be realistic.",
            )
            .temperature(0.0)
            .build(),
        )
        .step(
            Step::llm(
                STAGES[2],
                "Analyze the market for these refined products: {{input}}",
            )
            .system_prompt(
                "You are an energy market analyst. For the following list of refined products, \
                 provide a brief analysis of current market demand (high, medium, low) and general \
                 profitability trends.",
            )
            .temperature(0.0)
            .build(),
        )
        .step(
            Step::llm(
                STAGES[3],
                "Given the following potential distillation plan:\n\
                 --- DISTILLATION PLAN ---\n\
                 {{distillation_plan}}\n\
                 --- END DISTILLATION PLAN ---\n\
                 And the following market analysis:\n\
                 --- MARKET ANALYSIS ---\n\
                 {{input}}\n\
                 --- END MARKET ANALYSIS ---\n\
                 Please provide a concise recommendation on which products the refinery should \
                 prioritize or focus on to maximize value, considering both the potential yield and \
                 market conditions.",
            )
            .system_prompt(
                "You are a refinery production optimization expert. Your goal is to recommend \
                 a production strategy based on potential yields and current market conditions.",
            )
            .temperature(0.0)
            .build(),
        )
        .build()
}

/// Run the chain for `feedstock`
pub async fn run(
    feedstock: &str,
    provider: &dyn LLMProvider,
) -> WorkflowResult<(ChainOutput, ExecutionTrace)> {
    tracing::info!(feedstock, "Processing feedstock");
    chain().execute(feedstock, provider).await
}
