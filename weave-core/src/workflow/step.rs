//! Workflow Step definition

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::llm::{CallOptions, LLMProvider, LLMRequest, TokenUsage};

use super::execution::{StepTrace, WorkflowResult};

type TransformFn = Arc<dyn Fn(&str) -> WorkflowResult<String> + Send + Sync>;

/// Type of step execution
#[derive(Clone)]
pub enum StepType {
    /// LLM call with a prompt template
    LLM {
        /// System prompt for this step (the agent persona)
        system_prompt: Option<String>,
        /// User prompt template; `{{input}}` and `{{<step name>}}` are substituted
        prompt_template: String,
        /// Sampling options
        options: CallOptions,
    },
    /// Transform step (applies a function to the input text)
    Transform {
        /// Transform function
        transform: TransformFn,
    },
}

impl std::fmt::Debug for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepType::LLM {
                system_prompt,
                prompt_template,
                options,
            } => f
                .debug_struct("LLM")
                .field("system_prompt", system_prompt)
                .field("prompt_template", prompt_template)
                .field("options", options)
                .finish(),
            StepType::Transform { .. } => f.debug_struct("Transform").finish_non_exhaustive(),
        }
    }
}

/// Output from a step execution
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Output text
    pub text: String,
    /// Token usage if available
    pub usage: Option<TokenUsage>,
}

impl StepOutput {
    /// Create with text only
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Substitute `{{input}}` and `{{<name>}}` placeholders.
///
/// Placeholders with no matching output are left untouched.
pub fn render_template(template: &str, input: &str, outputs: &BTreeMap<String, String>) -> String {
    render_with(template, |key| match key {
        "input" => Some(input),
        name => outputs.get(name).map(String::as_str),
    })
}

/// Single-pass placeholder substitution.
///
/// Each `{{key}}` token of `template` is replaced by `lookup(key)` when that
/// returns a value. Substituted text is copied verbatim and never rescanned.
pub fn render_with<'a, F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let key = &after[..close];
                match lookup(key) {
                    Some(value) => rendered.push_str(value),
                    None => {
                        rendered.push_str("{{");
                        rendered.push_str(key);
                        rendered.push_str("}}");
                    }
                }
                rest = &after[close + 2..];
            }
            None => {
                rendered.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

/// A single step in a workflow
#[derive(Clone)]
pub struct Step {
    /// Step name for identification
    pub name: String,
    /// Step type (LLM, Transform)
    pub step_type: StepType,
    /// Optional description
    pub description: Option<String>,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("step_type", &self.step_type)
            .field("description", &self.description)
            .finish()
    }
}

impl Step {
    /// Create an LLM step with a prompt template
    ///
    /// The template can use `{{input}}` for the previous step's output and
    /// `{{name}}` for the output of any earlier step called `name`.
    pub fn llm(name: impl Into<String>, prompt_template: impl Into<String>) -> StepBuilder {
        StepBuilder {
            name: name.into(),
            step_type: StepType::LLM {
                system_prompt: None,
                prompt_template: prompt_template.into(),
                options: CallOptions::default(),
            },
            description: None,
        }
    }

    /// Create a transform step
    pub fn transform<F>(name: impl Into<String>, transform: F) -> StepBuilder
    where
        F: Fn(&str) -> WorkflowResult<String> + Send + Sync + 'static,
    {
        StepBuilder {
            name: name.into(),
            step_type: StepType::Transform {
                transform: Arc::new(transform),
            },
            description: None,
        }
    }

    /// Execute this step against the given input and earlier outputs
    pub async fn execute(
        &self,
        input: &str,
        outputs: &BTreeMap<String, String>,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<(StepOutput, StepTrace)> {
        let start = std::time::Instant::now();

        let (rendered, result) = match &self.step_type {
            StepType::LLM {
                system_prompt,
                prompt_template,
                options,
            } => {
                let rendered = render_template(prompt_template, input, outputs);
                let result = self
                    .execute_llm(&rendered, system_prompt.as_deref(), options, provider)
                    .await;
                (rendered, result)
            }
            StepType::Transform { transform } => {
                (input.to_string(), transform(input).map(StepOutput::with_text))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                tracing::debug!(step = %self.name, duration_ms, "Step completed");
                let trace = StepTrace::success(&self.name, rendered, &output.text, duration_ms)
                    .with_token_usage(output.usage);
                Ok((output, trace))
            }
            Err(e) => {
                tracing::warn!(step = %self.name, duration_ms, error = %e, "Step failed");
                Err(e)
            }
        }
    }

    /// Execute with no earlier outputs and return only the text
    pub async fn run(&self, input: &str, provider: &dyn LLMProvider) -> WorkflowResult<String> {
        let (output, _) = self.execute(input, &BTreeMap::new(), provider).await?;
        Ok(output.text)
    }

    async fn execute_llm(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: &CallOptions,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<StepOutput> {
        let request = match system_prompt {
            Some(system) => LLMRequest::with_system_prompt(system, prompt),
            None => LLMRequest::from_prompt(prompt),
        }
        .options(options.clone());

        let response = provider.generate_request(&request).await?;

        Ok(StepOutput {
            text: response.content,
            usage: response.usage,
        })
    }
}

/// Builder for creating Steps
pub struct StepBuilder {
    name: String,
    step_type: StepType,
    description: Option<String>,
}

impl StepBuilder {
    /// Add a description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a system prompt (for LLM steps)
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        if let StepType::LLM {
            ref mut system_prompt,
            ..
        } = self.step_type
        {
            *system_prompt = Some(prompt.into());
        }
        self
    }

    /// Set the sampling temperature (for LLM steps)
    pub fn temperature(mut self, temperature: f32) -> Self {
        if let StepType::LLM {
            ref mut options, ..
        } = self.step_type
        {
            *options = options.clone().with_temperature(temperature);
        }
        self
    }

    /// Replace the sampling options (for LLM steps)
    pub fn options(mut self, call_options: CallOptions) -> Self {
        if let StepType::LLM {
            ref mut options, ..
        } = self.step_type
        {
            *options = call_options;
        }
        self
    }

    /// Build the step
    pub fn build(self) -> Step {
        Step {
            name: self.name,
            step_type: self.step_type,
            description: self.description,
        }
    }
}
