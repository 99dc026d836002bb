//! Scenario tests against a scripted provider

use async_trait::async_trait;
use std::time::Duration;

use weave_core::agents::MISSING_KEY_MESSAGE;
use weave_core::embeddings::EmbeddingProvider;
use weave_core::error::Result;
use weave_core::llm::{DisabledProvider, ScriptedProvider};
use weave_core::scenarios::{contract, faq, product_plan, recipe, refinery, retail};
use weave_core::workflow::{DEFAULT_FALLBACK_MESSAGE, LabelMatch, RouteOutcome};

#[tokio::test]
async fn refinery_chain_feeds_each_stage_forward() {
    let provider = ScriptedProvider::new(vec![
        "light sweet crude",
        "45% gasoline",
        "gasoline demand high",
        "prioritize gasoline",
    ]);

    let (output, trace) = refinery::run(refinery::DEFAULT_FEEDSTOCK, &provider)
        .await
        .unwrap();

    let stages: Vec<&str> = output.steps.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(stages, refinery::STAGES);
    assert_eq!(output.final_output(), Some("prioritize gasoline"));
    assert_eq!(trace.completed_steps(), 4);

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(
        requests[0].user_prompt(),
        "Analyze the feedstock: West Texas Intermediate Crude"
    );
    assert!(requests[1].user_prompt().ends_with("light sweet crude"));
    assert_eq!(
        requests[2].user_prompt(),
        "Analyze the market for these refined products: 45% gasoline"
    );
    let last = requests[3].user_prompt();
    assert!(last.contains("--- DISTILLATION PLAN ---\n45% gasoline\n"));
    assert!(last.contains("--- MARKET ANALYSIS ---\ngasoline demand high\n"));
}

#[tokio::test]
async fn refinery_stage_text_is_not_expanded() {
    let provider = ScriptedProvider::new(vec![
        "light sweet crude",
        "45% gasoline",
        "see {{feedstock_analysis}} for detail",
        "prioritize gasoline",
    ]);

    refinery::run(refinery::DEFAULT_FEEDSTOCK, &provider)
        .await
        .unwrap();

    let last = provider.requests()[3].user_prompt().to_string();
    assert!(last.contains("--- MARKET ANALYSIS ---\nsee {{feedstock_analysis}} for detail\n"));
    assert!(!last.contains("light sweet crude"));
}

#[tokio::test]
async fn refinery_chain_stops_at_first_failure() {
    let provider = ScriptedProvider::with_results(vec![
        Ok("analysis".to_string()),
        Err(weave_core::error::WeaveError::Http("timeout".to_string())),
    ]);

    let result = refinery::run("Brent", &provider).await;

    assert!(result.is_err());
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn retail_exact_label_routes() {
    let provider = ScriptedProvider::new(vec!["  product research\n", "earbud specs"]);

    let (outcome, trace) = retail::run(retail::SAMPLE_QUERIES[0], LabelMatch::Exact, &provider)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RouteOutcome::Routed {
            label: retail::PRODUCT_RESEARCH.to_string(),
            output: "earbud specs".to_string(),
        }
    );
    assert_eq!(trace.selected_route.as_deref(), Some(retail::PRODUCT_RESEARCH));
    assert_eq!(
        provider.requests()[1].user_prompt(),
        format!("Research this product thoroughly: {}", retail::SAMPLE_QUERIES[0])
    );
}

#[tokio::test]
async fn retail_capitalized_label_falls_back() {
    let provider = ScriptedProvider::new(vec!["Product Research"]);

    let (outcome, _) = retail::run("earbuds?", LabelMatch::Exact, &provider)
        .await
        .unwrap();

    assert!(!outcome.is_routed());
    assert_eq!(outcome.output(), DEFAULT_FALLBACK_MESSAGE);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn retail_normalized_policy_accepts_capitalized_label() {
    let provider = ScriptedProvider::new(vec!["\"Product Research.\"", "earbud specs"]);

    let (outcome, _) = retail::run("earbuds?", LabelMatch::Normalized, &provider)
        .await
        .unwrap();

    assert!(outcome.is_routed());
    assert_eq!(outcome.output(), "earbud specs");
}

#[tokio::test]
async fn retail_pricing_runs_research_first() {
    let provider = ScriptedProvider::new(vec![
        "pricing strategy",
        "competitors charge $40",
        "buyers value organic",
        "price at $35",
    ]);

    let (outcome, _) = retail::run(retail::SAMPLE_QUERIES[2], LabelMatch::Exact, &provider)
        .await
        .unwrap();

    assert_eq!(outcome.output(), "price at $35");
    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    let strategist = requests[3].user_prompt();
    assert!(strategist.contains("Product Research Data:\ncompetitors charge $40"));
    assert!(strategist.contains("Customer Analysis Data:\nbuyers value organic"));
}

#[tokio::test]
async fn retail_query_placeholders_stay_literal() {
    let provider = ScriptedProvider::new(vec![
        "pricing strategy",
        "competitors charge $40",
        "buyers value organic",
        "price at $35",
    ]);
    let query = "Price for {{customer_analysis}} soap?";

    retail::run(query, LabelMatch::Exact, &provider).await.unwrap();

    let requests = provider.requests();
    assert_eq!(
        requests[1].user_prompt(),
        "Research this product thoroughly: Price for {{customer_analysis}} soap?"
    );
    assert!(
        requests[3]
            .user_prompt()
            .starts_with("Original Pricing Query: Price for {{customer_analysis}} soap?\n")
    );
}

fn contract_provider() -> ScriptedProvider {
    ScriptedProvider::with_responder(|request| {
        let system = request.system_prompt().unwrap_or_default();
        let reply = if system.contains("senior legal counsel") {
            "SUMMARY"
        } else if system.contains("legal expert") {
            "indemnification is one-sided"
        } else if system.contains("compliance expert") {
            "   "
        } else {
            "fees are uncapped"
        };
        Ok(reply.to_string())
    })
    .with_delay(Duration::from_millis(50))
}

#[tokio::test]
async fn contract_branches_run_concurrently_before_summary() {
    let provider = contract_provider();

    let (output, trace) = contract::run(contract::SAMPLE_CONTRACT, &provider)
        .await
        .unwrap();

    let keys: Vec<&str> = output.branches.keys().map(String::as_str).collect();
    assert_eq!(keys, vec![contract::COMPLIANCE, contract::FINANCIAL, contract::LEGAL]);
    assert_eq!(
        output.branches[contract::COMPLIANCE],
        "No compliance analysis provided."
    );
    assert_eq!(output.final_output(), "SUMMARY");
    assert_eq!(provider.max_in_flight(), 3);
    assert_eq!(trace.branches.len(), 3);

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    let summary = requests[3].user_prompt();
    assert!(summary.contains("Legal Terms Analysis:\nindemnification is one-sided"));
    assert!(summary.contains("Compliance Validation:\nNo compliance analysis provided."));
    assert!(summary.contains("Financial Risk Assessment:\nfees are uncapped"));
    assert!(summary.contains("CONSULTING AGREEMENT"));
    assert!(!summary.contains("ENTIRE AGREEMENT"));
}

#[tokio::test]
async fn recipe_retries_with_feedback_until_pass() {
    let provider = ScriptedProvider::new(vec![
        "Coconut pasta",
        "VERDICT: no coconut: FAILED - contains coconut.\nOverall Status: FAILED",
        "Lentil pasta",
        "Taste Rating: 8/10\nOverall Status: PASSED",
    ]);

    let (result, trace) = recipe::run(&recipe::RecipeRequest::default(), &provider)
        .await
        .unwrap();

    assert!(result.passed);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.output, "Lentil pasta");
    assert_eq!(trace.attempts.len(), 2);

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    assert!(requests[0].user_prompt().contains("This is the first attempt."));
    assert!(requests[1].user_prompt().contains("RECIPE:\nCoconut pasta\n"));
    let retry = requests[2].user_prompt();
    assert!(retry.contains("IMPORTANT: Your previous attempt had issues."));
    assert!(retry.contains("no coconut: FAILED"));
    assert!(!retry.contains("This is the first attempt."));
}

#[tokio::test]
async fn recipe_gives_up_after_five_attempts() {
    let provider = ScriptedProvider::new(Vec::<String>::new()).default_reply("Overall Status: FAILED");

    let (result, trace) = recipe::run(&recipe::RecipeRequest::default(), &provider)
        .await
        .unwrap();

    assert!(!result.passed);
    assert_eq!(result.iterations, 5);
    assert_eq!(trace.attempts.len(), 5);
    assert_eq!(provider.call_count(), 10);
}

#[tokio::test]
async fn faq_without_credentials_uses_placeholder() {
    let comparisons = faq::run(&["What is the critical path?"], &DisabledProvider).await;

    assert_eq!(comparisons.len(), 1);
    assert!(comparisons[0].hardcoded.starts_with("The critical path"));
    assert_eq!(comparisons[0].llm, MISSING_KEY_MESSAGE);
}

/// Places route descriptions and steps on one axis per role
struct RoleEmbeddings;

#[async_trait]
impl EmbeddingProvider for RoleEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = if text.starts_with("Responsible for defining product personas") {
            vec![1.0, 0.0, 0.0]
        } else if text.starts_with("Responsible for defining product features") {
            vec![0.0, 1.0, 0.0]
        } else if text.starts_with("Responsible for defining detailed engineering") {
            vec![0.0, 0.0, 1.0]
        } else if text.contains("stories") {
            vec![0.9, 0.1, 0.0]
        } else if text.contains("features") {
            vec![0.1, 0.9, 0.0]
        } else {
            vec![0.0, 0.1, 0.9]
        };
        Ok(vector)
    }
}

fn planning_provider(plan: &'static str) -> ScriptedProvider {
    ScriptedProvider::with_responder(move |request| {
        let system = request.system_prompt().unwrap_or_default();
        let reply = if system.starts_with("You are an action planning agent") {
            plan
        } else if system.starts_with("You are an evaluation agent") {
            "Yes, the answer meets the criteria."
        } else if system.contains("Product Manager") {
            "As a support agent, I want emails routed so that I answer faster."
        } else {
            "Task ID: T-1\nTask Title: Build the email classifier"
        };
        Ok(reply.to_string())
    })
}

#[tokio::test]
async fn product_plan_routes_each_step_to_a_role() {
    let provider = planning_provider("1. Write user stories\n\n2. Define development tasks\n");

    let plan = product_plan::run(
        "Email Router spec",
        product_plan::WORKFLOW_PROMPT,
        &provider,
        &RoleEmbeddings,
    )
    .await
    .unwrap();

    let agents: Vec<&str> = plan.steps.iter().map(|s| s.routed.agent.as_str()).collect();
    assert_eq!(
        agents,
        vec![product_plan::PRODUCT_MANAGER, product_plan::DEVELOPMENT_ENGINEER]
    );
    assert!(plan.final_output().starts_with("Task ID: T-1"));

    // planner, then worker + judge for each step
    assert_eq!(provider.call_count(), 5);
    let pm_system = provider.requests()[1].system_prompt().unwrap_or_default().to_string();
    assert!(pm_system.contains("Email Router spec"));
}

#[tokio::test]
async fn product_plan_without_steps() {
    let provider = planning_provider("\n\n");

    let plan = product_plan::run("spec", "Plan it", &provider, &RoleEmbeddings)
        .await
        .unwrap();

    assert!(plan.steps.is_empty());
    assert_eq!(plan.final_output(), product_plan::NO_STEPS_MESSAGE);
}
