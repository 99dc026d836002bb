//! Router Workflow Pattern
//!
//! Routes input to specialized handlers based on classification.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::llm::LLMProvider;

use super::chain::Chain;
use super::classifier::{Classification, Classifier};
use super::execution::{ExecutionTrace, WorkflowError, WorkflowResult};
use super::step::Step;

/// Message returned when no route matches
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't determine the appropriate agent for this query.";

/// A multi-call route target that is neither a single step nor a chain
#[async_trait]
pub trait RouteTask: Send + Sync {
    /// Handle the routed input and return the final text
    async fn handle(&self, input: &str, provider: &dyn LLMProvider) -> WorkflowResult<String>;
}

/// Handler for a route - a single step, a chain, or a custom task
pub enum RouteHandler {
    /// Single step handler
    Step(Step),
    /// Chain handler
    Chain(Chain),
    /// Custom async handler
    Custom(Arc<dyn RouteTask>),
}

impl std::fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteHandler::Step(step) => f.debug_tuple("Step").field(step).finish(),
            RouteHandler::Chain(chain) => f.debug_tuple("Chain").field(chain).finish(),
            RouteHandler::Custom(_) => f.debug_tuple("Custom").finish(),
        }
    }
}

impl RouteHandler {
    /// Execute the handler
    pub async fn execute(
        &self,
        input: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<(String, Option<ExecutionTrace>)> {
        match self {
            RouteHandler::Step(step) => {
                let (output, trace) = step.execute(input, &Default::default(), provider).await?;
                let mut exec_trace = ExecutionTrace::new(&step.name);
                exec_trace.add_step(trace);
                Ok((output.text, Some(exec_trace)))
            }
            RouteHandler::Chain(chain) => {
                let (output, trace) = chain.execute(input, provider).await?;
                Ok((
                    output.final_output().unwrap_or_default().to_string(),
                    Some(trace),
                ))
            }
            RouteHandler::Custom(task) => Ok((task.handle(input, provider).await?, None)),
        }
    }
}

/// What the router does when the classification matches no route
pub enum Fallback {
    /// Return a static message without calling the model again
    Message(String),
    /// Run a handler
    Handler(RouteHandler),
}

impl std::fmt::Debug for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Fallback::Handler(handler) => f.debug_tuple("Handler").field(handler).finish(),
        }
    }
}

impl Default for Fallback {
    fn default() -> Self {
        Fallback::Message(DEFAULT_FALLBACK_MESSAGE.to_string())
    }
}

/// Result of routing one input
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// A route handled the input
    Routed { label: String, output: String },
    /// Nothing matched; `output` is the fallback text
    Fallback { raw_label: String, output: String },
}

impl RouteOutcome {
    /// The final text, routed or not
    pub fn output(&self) -> &str {
        match self {
            RouteOutcome::Routed { output, .. } | RouteOutcome::Fallback { output, .. } => output,
        }
    }

    /// Whether a route handled the input
    pub fn is_routed(&self) -> bool {
        matches!(self, RouteOutcome::Routed { .. })
    }
}

/// Router workflow that directs input to handlers based on classification
pub struct Router {
    /// Router name
    name: String,
    /// Routes by label
    routes: HashMap<String, RouteHandler>,
    /// Behaviour when nothing matches
    fallback: Fallback,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("name", &self.name)
            .field("route_count", &self.routes.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl Router {
    /// Create a new router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Get the router name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of routes
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Route and execute with a classifier
    ///
    /// An unmatched classification is not an error; it yields
    /// [`RouteOutcome::Fallback`].
    pub async fn execute<C: Classifier + ?Sized>(
        &self,
        input: &str,
        classifier: &C,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<(RouteOutcome, RouterExecutionTrace)> {
        let start = std::time::Instant::now();

        let classification = classifier.classify(input, provider).await?;
        let classification_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            router = %self.name,
            classified_as = %classification.raw,
            "Query classified"
        );

        let (outcome, handler_trace) = match &classification.label {
            Some(label) => {
                let handler = self.routes.get(label).ok_or_else(|| {
                    WorkflowError::InvalidConfig(format!("No route registered for label: {}", label))
                })?;
                tracing::info!(router = %self.name, route = %label, "Routing query");
                let (output, trace) = handler.execute(input, provider).await?;
                (
                    RouteOutcome::Routed {
                        label: label.clone(),
                        output,
                    },
                    trace,
                )
            }
            None => {
                tracing::warn!(
                    router = %self.name,
                    raw_label = %classification.raw,
                    "Could not classify the query into a known route"
                );
                let (output, trace) = match &self.fallback {
                    Fallback::Message(message) => (message.clone(), None),
                    Fallback::Handler(handler) => handler.execute(input, provider).await?,
                };
                (
                    RouteOutcome::Fallback {
                        raw_label: classification.raw.clone(),
                        output,
                    },
                    trace,
                )
            }
        };

        let trace = RouterExecutionTrace {
            router_name: self.name.clone(),
            selected_route: classification.label.clone(),
            classification,
            classification_duration_ms: classification_ms,
            handler_trace,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        Ok((outcome, trace))
    }
}

/// Router execution trace
#[derive(Debug, Clone)]
pub struct RouterExecutionTrace {
    /// Router name
    pub router_name: String,
    /// Classification result
    pub classification: Classification,
    /// Selected route label, `None` for the fallback
    pub selected_route: Option<String>,
    /// Classification duration
    pub classification_duration_ms: u64,
    /// Handler execution trace
    pub handler_trace: Option<ExecutionTrace>,
    /// Total duration
    pub total_duration_ms: u64,
}

/// Builder for Router
pub struct RouterBuilder {
    name: String,
    routes: HashMap<String, RouteHandler>,
    fallback: Fallback,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            name: "router".to_string(),
            routes: HashMap::new(),
            fallback: Fallback::default(),
        }
    }

    /// Set the router name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a step route
    pub fn step_route(mut self, label: impl Into<String>, step: Step) -> Self {
        self.routes.insert(label.into(), RouteHandler::Step(step));
        self
    }

    /// Add a chain route
    pub fn chain_route(mut self, label: impl Into<String>, chain: Chain) -> Self {
        self.routes.insert(label.into(), RouteHandler::Chain(chain));
        self
    }

    /// Add a custom task route
    pub fn task_route(mut self, label: impl Into<String>, task: impl RouteTask + 'static) -> Self {
        self.routes
            .insert(label.into(), RouteHandler::Custom(Arc::new(task)));
        self
    }

    /// Set the static fallback message
    pub fn fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback = Fallback::Message(message.into());
        self
    }

    /// Set the fallback route (step)
    pub fn fallback_step(mut self, step: Step) -> Self {
        self.fallback = Fallback::Handler(RouteHandler::Step(step));
        self
    }

    /// Build the router
    pub fn build(self) -> Router {
        Router {
            name: self.name,
            routes: self.routes,
            fallback: self.fallback,
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;
    use crate::workflow::LLMClassifier;

    fn classifier() -> LLMClassifier {
        LLMClassifier::new(vec!["greeting", "question"])
    }

    fn router() -> Router {
        Router::builder()
            .name("test-router")
            .step_route("greeting", Step::llm("greet", "Greet: {{input}}").build())
            .step_route("question", Step::llm("answer", "Answer: {{input}}").build())
            .build()
    }

    struct Echo;

    #[async_trait]
    impl RouteTask for Echo {
        async fn handle(&self, input: &str, _provider: &dyn LLMProvider) -> WorkflowResult<String> {
            Ok(format!("echo {}", input))
        }
    }

    #[test]
    fn test_router_builder() {
        let router = router();
        assert_eq!(router.name(), "test-router");
        assert_eq!(router.route_count(), 2);
    }

    #[tokio::test]
    async fn test_router_dispatches_matched_label() {
        let provider = ScriptedProvider::new(vec!["question", "42"]);

        let (outcome, trace) = router()
            .execute("what is six times seven?", &classifier(), &provider)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RouteOutcome::Routed {
                label: "question".to_string(),
                output: "42".to_string()
            }
        );
        assert_eq!(trace.selected_route.as_deref(), Some("question"));
        assert!(trace.handler_trace.is_some());
        assert_eq!(
            provider.requests()[1].user_prompt(),
            "Answer: what is six times seven?"
        );
    }

    #[tokio::test]
    async fn test_unmatched_label_uses_static_fallback() {
        let provider = ScriptedProvider::new(vec!["Question"]);

        let (outcome, trace) = router()
            .execute("what?", &classifier(), &provider)
            .await
            .unwrap();

        assert!(!outcome.is_routed());
        assert_eq!(outcome.output(), DEFAULT_FALLBACK_MESSAGE);
        assert_eq!(trace.selected_route, None);
        assert_eq!(trace.classification.raw, "Question");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_step() {
        let provider = ScriptedProvider::new(vec!["unknown", "generic reply"]);
        let router = Router::builder()
            .step_route("greeting", Step::llm("greet", "{{input}}").build())
            .fallback_step(Step::llm("default", "{{input}}").build())
            .build();

        let (outcome, _) = router
            .execute("hmm", &classifier(), &provider)
            .await
            .unwrap();

        assert_eq!(outcome.output(), "generic reply");
    }

    #[tokio::test]
    async fn test_task_route() {
        let provider = ScriptedProvider::new(vec!["greeting"]);
        let router = Router::builder().task_route("greeting", Echo).build();

        let (outcome, trace) = router
            .execute("hi", &classifier(), &provider)
            .await
            .unwrap();

        assert_eq!(outcome.output(), "echo hi");
        assert!(trace.handler_trace.is_none());
    }

    #[tokio::test]
    async fn test_label_without_route_is_invalid() {
        let provider = ScriptedProvider::new(vec!["question"]);
        let router = Router::builder().task_route("greeting", Echo).build();

        let result = router.execute("why?", &classifier(), &provider).await;
        assert!(matches!(result, Err(WorkflowError::InvalidConfig(_))));
    }
}
