//! Retail query router: product research, customer analysis, pricing strategy

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::llm::LLMProvider;
use crate::workflow::{
    LLMClassifier, LabelMatch, RouteOutcome, RouteTask, Router, RouterExecutionTrace, Step,
    WorkflowResult,
};

pub const PRODUCT_RESEARCH: &str = "product research";
pub const CUSTOMER_ANALYSIS: &str = "customer analysis";
pub const PRICING_STRATEGY: &str = "pricing strategy";

/// Queries run when none are given
pub const SAMPLE_QUERIES: [&str; 3] = [
    "What are the specifications and current market trends for wireless earbuds?",
    "What do customers think about our premium coffee brand?",
    "What should be the optimal price for our new organic skincare line?",
];

const CLASSIFIER_PROMPT: &str = "You are a helpful AI assistant that categorizes retail-related user queries. \
Based on the user's query, determine if it is primarily about:\n\
* \"product research\" (e.g., asking for product specs, trends, competitor prices)\n\
* \"customer analysis\" (e.g., asking about customer feedback, preferences, purchase patterns)\n\
* \"pricing strategy\" (e.g., asking for optimal pricing for a product)\n\
Respond only with one of these exact phrases: \"product research\", \"customer analysis\", or \"pricing strategy\".";

fn product_researcher() -> Step {
    Step::llm("product_research", "Research this product thoroughly: {{input}}")
        .system_prompt(
            "You are a product research agent for a retail company. Your task is to provide \
             structured information about products, market trends, and competitor pricing. You MUST \
             provide detailed and accurate information that can help inform product development and \
             pricing strategies.",
        )
        .temperature(0.0)
        .build()
}

fn customer_analyzer() -> Step {
    Step::llm("customer_analysis", "Analyze customer behavior for: {{input}}")
        .system_prompt(
            "You are a customer analysis agent. Your task is to analyze customer feedback, \
             preferences, and purchasing patterns. You MUST provide insights that can help inform \
             product development and marketing strategies.",
        )
        .temperature(0.0)
        .build()
}

fn pricing_strategist() -> Step {
    Step::llm(
        "pricing_strategy",
        "Original Pricing Query: {{input}}\n\
         Product Research Data:\n{{product_research}}\n\
         Customer Analysis Data:\n{{customer_analysis}}\n\
         Based on all the above information, please provide a recommended pricing strategy, \
         suggest an optimal price or price range, and explain your reasoning.",
    )
    .system_prompt(
        "You are a pricing strategist agent. Your task is to recommend optimal pricing \
         strategies based on product research and customer analysis.",
    )
    .temperature(0.0)
    .build()
}

/// Pricing runs both research agents first, then the strategist over their output
pub struct PricingPipeline {
    research: Step,
    customers: Step,
    strategist: Step,
}

impl Default for PricingPipeline {
    fn default() -> Self {
        Self {
            research: product_researcher(),
            customers: customer_analyzer(),
            strategist: pricing_strategist(),
        }
    }
}

#[async_trait]
impl RouteTask for PricingPipeline {
    async fn handle(&self, input: &str, provider: &dyn LLMProvider) -> WorkflowResult<String> {
        let mut gathered = BTreeMap::new();
        for step in [&self.research, &self.customers] {
            let text = step.run(input, provider).await?;
            gathered.insert(step.name.clone(), text);
        }

        let (output, _) = self.strategist.execute(input, &gathered, provider).await?;
        Ok(output.text)
    }
}

/// Build the classifier with the given match policy
pub fn classifier(policy: LabelMatch) -> LLMClassifier {
    LLMClassifier::new(vec![PRODUCT_RESEARCH, CUSTOMER_ANALYSIS, PRICING_STRATEGY])
        .with_system_prompt(CLASSIFIER_PROMPT)
        .with_prompt_template("Categorize this query: {{input}}")
        .with_match_policy(policy)
}

/// Build the retail router
pub fn router() -> Router {
    Router::builder()
        .name("retail")
        .step_route(PRODUCT_RESEARCH, product_researcher())
        .step_route(CUSTOMER_ANALYSIS, customer_analyzer())
        .task_route(PRICING_STRATEGY, PricingPipeline::default())
        .build()
}

/// Classify and answer one query
pub async fn run(
    query: &str,
    policy: LabelMatch,
    provider: &dyn LLMProvider,
) -> WorkflowResult<(RouteOutcome, RouterExecutionTrace)> {
    router().execute(query, &classifier(policy), provider).await
}
