//! Program-management FAQ: hardcoded answers side by side with the LLM's

use crate::agents::FaqAgent;
use crate::llm::LLMProvider;

/// Model the FAQ demo talks to unless one is configured
pub const FAQ_MODEL: &str = "gpt-5-nano";

/// Questions asked when none are given
pub const SAMPLE_QUESTIONS: [&str; 5] = [
    "What is a Gantt chart?",
    "Tell me about Agile methodology.",
    "What are key project milestones?",
    "What is risk management in projects?",
    "Can you explain a sprint review?",
];

/// Both answers to one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub question: String,
    pub hardcoded: String,
    pub llm: String,
}

/// Answer `question` both ways
pub async fn compare(agent: &FaqAgent, question: &str, provider: &dyn LLMProvider) -> Comparison {
    Comparison {
        question: question.to_string(),
        hardcoded: agent.hardcoded_answer(question).to_string(),
        llm: agent.llm_answer(question, provider).await,
    }
}

/// Answer every question in order
pub async fn run<S: AsRef<str>>(questions: &[S], provider: &dyn LLMProvider) -> Vec<Comparison> {
    let agent = FaqAgent::new();
    let mut comparisons = Vec::with_capacity(questions.len());
    for question in questions {
        comparisons.push(compare(&agent, question.as_ref(), provider).await);
    }
    comparisons
}
