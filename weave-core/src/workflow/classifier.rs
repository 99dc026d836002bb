//! Classifiers for Router Workflow Pattern
//!
//! Classifiers turn free text into one of a fixed set of labels, or no label.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::{CallOptions, LLMProvider, LLMRequest};

use super::execution::{WorkflowError, WorkflowResult};
use super::step::render_template;

/// How a model reply is compared against the known labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMatch {
    /// Case-sensitive equality after a single trim of the reply
    #[default]
    Exact,
    /// Case-insensitive equality with internal whitespace collapsed
    Normalized,
}

impl LabelMatch {
    /// Find the label matching `reply`, if any
    pub fn find<'a>(&self, reply: &str, labels: &'a [String]) -> Option<&'a String> {
        match self {
            LabelMatch::Exact => labels.iter().find(|label| label.as_str() == reply),
            LabelMatch::Normalized => {
                let reply = normalize(reply);
                labels.iter().find(|label| normalize(label) == reply)
            }
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
        .to_lowercase()
}

/// Classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The matched label, or `None` when the reply matched nothing
    pub label: Option<String>,
    /// The classifier's reply after trimming
    pub raw: String,
}

impl Classification {
    /// A classification that matched `label`
    pub fn matched(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            raw: label.clone(),
            label: Some(label),
        }
    }

    /// A classification that matched nothing
    pub fn unmatched(raw: impl Into<String>) -> Self {
        Self {
            label: None,
            raw: raw.into(),
        }
    }
}

/// Trait for classifying input
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the input
    async fn classify(
        &self,
        input: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<Classification>;

    /// Get the possible labels this classifier can produce
    fn labels(&self) -> &[String];
}

/// LLM-based classifier
pub struct LLMClassifier {
    labels: Vec<String>,
    system_prompt: String,
    prompt_template: String,
    options: CallOptions,
    match_policy: LabelMatch,
}

impl std::fmt::Debug for LLMClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMClassifier")
            .field("labels", &self.labels)
            .field("match_policy", &self.match_policy)
            .finish()
    }
}

impl LLMClassifier {
    /// Create a new LLM classifier
    ///
    /// # Arguments
    ///
    /// * `labels` - Possible classification labels
    pub fn new<S: Into<String>>(labels: Vec<S>) -> Self {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let quoted = labels
            .iter()
            .map(|l| format!("\"{}\"", l))
            .collect::<Vec<_>>()
            .join(", ");

        let system_prompt = format!(
            "You are a classifier. Classify the user's input into exactly one of these categories: {}. \
            Respond with ONLY the category name, nothing else.",
            quoted
        );

        Self {
            labels,
            system_prompt,
            prompt_template: "{{input}}".to_string(),
            options: CallOptions::new().with_temperature(0.0),
            match_policy: LabelMatch::Exact,
        }
    }

    /// Create with a custom system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Wrap the input in a user prompt template (`{{input}}` is substituted)
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Set the label match policy
    pub fn with_match_policy(mut self, policy: LabelMatch) -> Self {
        self.match_policy = policy;
        self
    }

    /// Replace the sampling options
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl Classifier for LLMClassifier {
    async fn classify(
        &self,
        input: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<Classification> {
        if self.labels.is_empty() {
            return Err(WorkflowError::InvalidConfig(
                "Classifier has no labels".to_string(),
            ));
        }

        let prompt = render_template(&self.prompt_template, input, &Default::default());
        let request = LLMRequest::with_system_prompt(&self.system_prompt, prompt)
            .options(self.options.clone());

        let response = provider.generate_request(&request).await?;
        let raw = response.content.trim().to_string();

        let classification = match self.match_policy.find(&raw, &self.labels) {
            Some(label) => Classification {
                label: Some(label.clone()),
                raw,
            },
            None => Classification::unmatched(raw),
        };

        tracing::debug!(
            raw = %classification.raw,
            label = ?classification.label,
            "Input classified"
        );

        Ok(classification)
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;

    fn labels() -> Vec<String> {
        vec![
            "product research".to_string(),
            "customer analysis".to_string(),
            "pricing strategy".to_string(),
        ]
    }

    #[test]
    fn test_exact_match_is_case_sensitive() {
        let labels = labels();
        assert_eq!(
            LabelMatch::Exact.find("product research", &labels),
            Some(&labels[0])
        );
        assert_eq!(LabelMatch::Exact.find("Product Research", &labels), None);
        assert_eq!(LabelMatch::Exact.find("\"pricing strategy\"", &labels), None);
    }

    #[test]
    fn test_normalized_match() {
        let labels = labels();
        assert_eq!(
            LabelMatch::Normalized.find("Product   Research.", &labels),
            Some(&labels[0])
        );
        assert_eq!(
            LabelMatch::Normalized.find("\"Pricing Strategy\"", &labels),
            Some(&labels[2])
        );
        assert_eq!(LabelMatch::Normalized.find("shipping", &labels), None);
    }

    #[tokio::test]
    async fn test_llm_classifier_trims_once() {
        let provider = ScriptedProvider::new(vec!["  customer analysis\n"]);
        let classifier =
            LLMClassifier::new(labels()).with_prompt_template("Categorize this query: {{input}}");

        let classification = classifier
            .classify("What do customers think?", &provider)
            .await
            .unwrap();

        assert_eq!(classification.label.as_deref(), Some("customer analysis"));
        assert_eq!(
            provider.requests()[0].user_prompt(),
            "Categorize this query: What do customers think?"
        );
        assert_eq!(provider.requests()[0].options.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_llm_classifier_unmatched_keeps_raw() {
        let provider = ScriptedProvider::new(vec!["Product Research"]);
        let classifier = LLMClassifier::new(labels());

        let classification = classifier.classify("earbuds", &provider).await.unwrap();

        assert_eq!(classification.label, None);
        assert_eq!(classification.raw, "Product Research");
    }

    #[tokio::test]
    async fn test_classifier_without_labels_is_invalid() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let classifier = LLMClassifier::new(Vec::<String>::new());

        let result = classifier.classify("x", &provider).await;
        assert!(matches!(result, Err(WorkflowError::InvalidConfig(_))));
    }
}
