//! Embedding-similarity router

use std::sync::Arc;

use crate::embeddings::{EmbeddingProvider, cosine_similarity};
use crate::error::{Result, WeaveError};
use crate::llm::LLMProvider;

use super::Agent;

/// A registered route: an agent and the description it is matched on
pub struct AgentRoute {
    pub name: String,
    pub description: String,
    pub agent: Arc<dyn Agent>,
}

impl std::fmt::Debug for AgentRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRoute")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Response from the agent a prompt was routed to
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedResponse {
    /// Name of the selected route
    pub agent: String,
    /// Cosine similarity of the prompt to the route description
    pub similarity: f32,
    /// The agent's response
    pub response: String,
}

/// Dispatches each prompt to the route whose description is most similar
#[derive(Debug, Default)]
pub struct RoutingAgent {
    routes: Vec<AgentRoute>,
}

impl RoutingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route
    pub fn route(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        agent: Arc<dyn Agent>,
    ) -> Self {
        self.routes.push(AgentRoute {
            name: name.into(),
            description: description.into(),
            agent,
        });
        self
    }

    /// Registered routes, in registration order
    pub fn routes(&self) -> &[AgentRoute] {
        &self.routes
    }

    /// Pick the best route for `prompt` without running it
    ///
    /// Ties go to the route registered first.
    pub async fn select(
        &self,
        prompt: &str,
        embeddings: &dyn EmbeddingProvider,
    ) -> Result<(&AgentRoute, f32)> {
        if self.routes.is_empty() {
            return Err(WeaveError::Configuration(
                "Routing agent has no routes".to_string(),
            ));
        }

        let prompt_vector = embeddings.embed(prompt).await?;
        let descriptions: Vec<&str> = self.routes.iter().map(|r| r.description.as_str()).collect();
        let route_vectors = embeddings.embed_batch(&descriptions).await?;

        let mut best: Option<(&AgentRoute, f32)> = None;
        for (route, vector) in self.routes.iter().zip(&route_vectors) {
            let similarity = cosine_similarity(&prompt_vector, vector);
            tracing::debug!(route = %route.name, similarity, "Route similarity");
            if best.is_none_or(|(_, score)| similarity > score) {
                best = Some((route, similarity));
            }
        }

        best.ok_or_else(|| WeaveError::MalformedResponse("No route embeddings returned".to_string()))
    }

    /// Route `prompt` to the most similar agent and return its response
    pub async fn dispatch(
        &self,
        prompt: &str,
        embeddings: &dyn EmbeddingProvider,
        provider: &dyn LLMProvider,
    ) -> Result<RoutedResponse> {
        let (route, similarity) = self.select(prompt, embeddings).await?;
        tracing::info!(agent = %route.name, similarity, "Routing prompt");

        let response = route.agent.respond(prompt, provider).await?;
        Ok(RoutedResponse {
            agent: route.name.clone(),
            similarity,
            response,
        })
    }
}
