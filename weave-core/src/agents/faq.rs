//! Program-management FAQ agent

use crate::error::WeaveError;
use crate::llm::{CallOptions, LLMProvider, ReasoningEffort, Verbosity, complete};

/// Answer for questions the keyword table does not cover
pub const UNKNOWN_QUESTION_ANSWER: &str = "I'm sorry, I don't have an answer for that question.";

/// Placeholder returned when no API credential is configured
pub const MISSING_KEY_MESSAGE: &str =
    "LLM API key not found. Please set the OPENAI_API_KEY environment variable.";

/// Prefix of the message returned for any other LLM failure
pub const LLM_ERROR_PREFIX: &str = "An error occurred while fetching the answer from the LLM: ";

const SYSTEM_PROMPT: &str = "You are an expert assistant specializing in program management.";

/// Keyword table, checked in order against the lowercased question
const HARDCODED_ANSWERS: &[(&str, &str)] = &[
    (
        "gantt chart",
        "A Gantt chart is a visual representation of a project schedule, showing tasks, durations, and dependencies.",
    ),
    (
        "agile",
        "Agile is a project management methodology that emphasizes iterative development, collaboration, and flexibility.",
    ),
    (
        "sprint",
        "A sprint is a time-boxed period in Agile development during which specific work is completed and made ready for review.",
    ),
    (
        "critical path",
        "The critical path is the sequence of tasks that determines the minimum project duration.",
    ),
    (
        "milestone",
        "A milestone is a significant point or event in a project, often used to measure progress.",
    ),
];

/// Answers program-management questions from a keyword table or an LLM
#[derive(Debug, Clone)]
pub struct FaqAgent {
    options: CallOptions,
}

impl Default for FaqAgent {
    fn default() -> Self {
        Self {
            options: CallOptions::new().with_reasoning(ReasoningEffort::Minimal, Verbosity::Low),
        }
    }
}

impl FaqAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sampling options
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Answer from the keyword table
    pub fn hardcoded_answer(&self, question: &str) -> &'static str {
        let question = question.to_lowercase();
        HARDCODED_ANSWERS
            .iter()
            .find(|(keyword, _)| question.contains(keyword))
            .map(|(_, answer)| *answer)
            .unwrap_or(UNKNOWN_QUESTION_ANSWER)
    }

    /// Answer with the LLM
    ///
    /// Never fails: a missing credential yields [`MISSING_KEY_MESSAGE`] and any
    /// other failure a readable error string.
    pub async fn llm_answer(&self, question: &str, provider: &dyn LLMProvider) -> String {
        match complete(provider, SYSTEM_PROMPT, question, self.options.clone()).await {
            Ok(answer) => answer.trim().to_string(),
            Err(WeaveError::MissingCredential(_)) => MISSING_KEY_MESSAGE.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "FAQ LLM call failed");
                format!("{}{}", LLM_ERROR_PREFIX, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{DisabledProvider, ScriptedProvider};

    #[test]
    fn test_hardcoded_answers() {
        let agent = FaqAgent::new();
        assert!(agent.hardcoded_answer("What is a Gantt chart?").starts_with("A Gantt chart"));
        assert!(agent.hardcoded_answer("Tell me about AGILE.").starts_with("Agile is"));
        assert!(
            agent
                .hardcoded_answer("Can you explain a sprint review?")
                .starts_with("A sprint is")
        );
        assert!(
            agent
                .hardcoded_answer("What are key project milestones?")
                .starts_with("A milestone")
        );
        assert_eq!(
            agent.hardcoded_answer("What is risk management in projects?"),
            UNKNOWN_QUESTION_ANSWER
        );
    }

    #[test]
    fn test_keyword_order() {
        // "agile" is checked before "sprint"
        let agent = FaqAgent::new();
        assert!(agent.hardcoded_answer("agile sprint").starts_with("Agile is"));
    }

    #[tokio::test]
    async fn test_missing_key_placeholder() {
        let answer = FaqAgent::new().llm_answer("What is a sprint?", &DisabledProvider).await;
        assert_eq!(answer, MISSING_KEY_MESSAGE);
    }

    #[tokio::test]
    async fn test_llm_failure_message() {
        let provider = ScriptedProvider::with_results(vec![Err(WeaveError::Http(
            "connection refused".to_string(),
        ))]);

        let answer = FaqAgent::new().llm_answer("What is a sprint?", &provider).await;
        assert!(answer.starts_with(LLM_ERROR_PREFIX));
        assert!(answer.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_llm_answer_is_trimmed_and_uses_reasoning_options() {
        let provider = ScriptedProvider::new(vec!["\n  A sprint is a short iteration.  \n"]);

        let answer = FaqAgent::new().llm_answer("What is a sprint?", &provider).await;

        assert_eq!(answer, "A sprint is a short iteration.");
        let request = &provider.requests()[0];
        assert_eq!(request.system_prompt(), Some(SYSTEM_PROMPT));
        assert_eq!(request.options.reasoning_effort, Some(ReasoningEffort::Minimal));
        assert_eq!(request.options.verbosity, Some(Verbosity::Low));
        assert_eq!(request.options.temperature, None);
    }
}
