//! Recipe optimizer: a chef generates, a nutritionist evaluates, until the recipe passes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::{CallOptions, LLMProvider, LLMRequest};
use crate::workflow::{
    DEFAULT_MAX_ITERATIONS, Evaluator, EvaluatorOptimizer, EvaluatorOptimizerTrace, LLMGenerator,
    Optimized, WorkflowResult,
};

/// A dish and the constraints it must satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRequest {
    pub base_dish: String,
    pub constraints: Vec<String>,
}

impl Default for RecipeRequest {
    fn default() -> Self {
        Self {
            base_dish: "pasta".to_string(),
            constraints: [
                "gluten-free",
                "vegan",
                "under 500 calories per serving",
                "high protein (>15g per serving)",
                "no coconut",
                "taste must be rated 7/10 or higher",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl RecipeRequest {
    /// The opening sentence of the chef's prompt
    pub fn creation_prompt(&self) -> String {
        format!(
            "Create a '{}' recipe that meets ALL of the following constraints: {}.",
            self.base_dish,
            self.constraints.join(", ")
        )
    }
}

const CHEF_SYSTEM_PROMPT: &str = "You are an innovative and highly skilled chef, renowned for creating \
delicious recipes that also meet specific dietary and nutritional targets. \
You are good at interpreting user requests and also at refining your creations based on precise feedback.\n\n\
IMPORTANT OUTPUT RULES:\n\
- Output ONLY the recipe content in the structured format requested.\n\
- Do NOT include conversational filler, greetings, or follow-up questions \
(e.g., no 'Absolutely!', no 'Would you like me to adjust...').\n\
- Start directly with the recipe name.";

const SECTIONS: &str = "\n\nProvide EXACTLY these sections:\n\
1. **Name:** A creative name for the dish\n\
2. **Ingredients:** A list with quantities\n\
3. **Instructions:** Step-by-step\n\
4. **Estimated Calories:** per serving (number)\n\
5. **Estimated Protein:** grams per serving (number)\n\
6. **Taste Profile:** A short description";

const NUTRITIONIST_SYSTEM_PROMPT: &str = "You are an extremely precise nutrition and dietary compliance evaluator.\n\n\
PROCESS - For EACH constraint you MUST follow these two steps:\n\
  Step 1 (REASONING): Compare the recipe's actual value to the constraint threshold. \
Write your comparison explicitly (e.g., '16g > 15g').\n\
  Step 2 (VERDICT): Based ONLY on the reasoning above, write PASSED or FAILED.\n\n\
STRICT RULES:\n\
- NEVER write the VERDICT before the REASONING.\n\
- If the numeric value meets or exceeds the threshold, the verdict is PASSED. \
Example: 16g protein > 15g requirement -> PASSED.\n\
- Judge based on what the recipe ACTUALLY contains, not hypothetical concerns. \
Nutritional yeast IS vegan. Standard plant ingredients ARE gluten-free unless stated otherwise.\n\
- 'Overall Status' MUST be logically consistent: if ANY VERDICT is FAILED, Overall Status MUST be FAILED.\n\
- Use ONLY the exact output format specified. No extra commentary.";

/// Chef agent
pub fn recipe_creator() -> LLMGenerator {
    LLMGenerator::new(CHEF_SYSTEM_PROMPT, format!("{{{{input}}}}{{{{feedback}}}}{}", SECTIONS))
        .with_feedback_template(
            "\n\nIMPORTANT: Your previous attempt had issues. \
             Please revise the recipe based on this specific feedback:\n{{feedback}}\n\
             Ensure all original constraints AND this feedback are addressed.",
        )
        .with_first_attempt_note("\nThis is the first attempt.")
        .with_options(CallOptions::new().with_temperature(0.7))
}

/// Nutritionist agent: judges a recipe against every constraint
#[derive(Debug, Clone)]
pub struct NutritionEvaluator {
    request: RecipeRequest,
    options: CallOptions,
}

impl NutritionEvaluator {
    pub fn new(request: RecipeRequest) -> Self {
        Self {
            request,
            options: CallOptions::new().with_temperature(0.0),
        }
    }

    fn prompt(&self, recipe: &str) -> String {
        let count = self.request.constraints.len();
        let numbered = self
            .request
            .constraints
            .iter()
            .enumerate()
            .map(|(i, c)| format!("  {}. {}", i + 1, c))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Evaluate the following RECIPE against the specified constraints.\n\n\
             RECIPE:\n{recipe}\n\n\
             CONSTRAINTS TO EVALUATE ({count} total - you MUST evaluate ALL {count}):\n\
             {numbered}\n\n\
             OUTPUT FORMAT - For each constraint, write exactly TWO lines:\n\
             REASONING: <constraint> - <recipe value> vs <threshold>. <value> <comparison operator> <threshold> = <true/false>.\n\
             VERDICT: <constraint verbatim>: PASSED\n\
             or\n\
             VERDICT: <constraint verbatim>: FAILED - <reason>. <fix suggestion>.\n\n\
             === FEW-SHOT EXAMPLES ===\n\n\
             REASONING: high protein (>15g per serving) - Recipe estimates 16g per serving. 16g > 15g = true.\n\
             VERDICT: high protein (>15g per serving): PASSED\n\n\
             REASONING: under 500 calories per serving - Recipe estimates 650 kcal. 650 < 500 = false.\n\
             VERDICT: under 500 calories per serving: FAILED - Estimated 650 calories. Suggest reducing oil by half.\n\n\
             REASONING: no coconut - Recipe ingredients do not include coconut in any form.\n\
             VERDICT: no coconut: PASSED\n\n\
             === END EXAMPLES ===\n\n\
             After evaluating ALL {count} constraints, you MUST write this MANDATORY line:\n\
             Taste Rating: <N>/10\n\n\
             SELF-CHECK: Re-read all VERDICT lines above. Count how many say FAILED.\n\
             If count == 0, write: Overall Status: PASSED\n\
             If count >= 1, write: Overall Status: FAILED"
        )
    }
}

#[async_trait]
impl Evaluator for NutritionEvaluator {
    async fn evaluate(
        &self,
        _input: &str,
        output: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<String> {
        let request = LLMRequest::with_system_prompt(NUTRITIONIST_SYSTEM_PROMPT, self.prompt(output))
            .options(self.options.clone());
        Ok(provider.generate_request(&request).await?.content)
    }
}

/// Build the optimizer for `request`
pub fn workflow(
    request: &RecipeRequest,
    max_iterations: usize,
) -> EvaluatorOptimizer<LLMGenerator, NutritionEvaluator> {
    EvaluatorOptimizer::builder(recipe_creator(), NutritionEvaluator::new(request.clone()))
        .name("recipe-optimizer")
        .max_iterations(max_iterations)
        .build()
}

/// Optimize `request` with the default attempt ceiling
pub async fn run(
    request: &RecipeRequest,
    provider: &dyn LLMProvider,
) -> WorkflowResult<(Optimized, EvaluatorOptimizerTrace)> {
    run_with_limit(request, DEFAULT_MAX_ITERATIONS, provider).await
}

/// Optimize `request` with an explicit attempt ceiling
pub async fn run_with_limit(
    request: &RecipeRequest,
    max_iterations: usize,
    provider: &dyn LLMProvider,
) -> WorkflowResult<(Optimized, EvaluatorOptimizerTrace)> {
    workflow(request, max_iterations)
        .execute(&request.creation_prompt(), provider)
        .await
}
