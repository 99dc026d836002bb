//! Scripted provider for deterministic, offline workflow runs
//!
//! Returns predetermined replies and records every request it receives.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Result, WeaveError};
use crate::llm::{LLMProvider, LLMRequest, LLMResponse, ModelInfo, TokenUsage};

type Responder = Arc<dyn Fn(&LLMRequest) -> Result<String> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Result<String>>>),
    Responder(Responder),
}

/// A provider that replays scripted replies.
///
/// Queued replies are returned in order; once the queue is empty the default
/// reply is used. A responder closure can instead compute the reply from the
/// request, which keeps concurrent branches deterministic.
pub struct ScriptedProvider {
    script: Script,
    default_reply: String,
    delay: Option<Duration>,
    requests: Mutex<Vec<LLMRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl std::fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("default_reply", &self.default_reply)
            .field("delay", &self.delay)
            .field("calls", &self.call_count())
            .finish()
    }
}

impl ScriptedProvider {
    /// Create a provider that replies with `replies` in order.
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self::from_script(Script::Queue(Mutex::new(
            replies.into_iter().map(|r| Ok(r.into())).collect(),
        )))
    }

    /// Create a provider whose replies may include failures.
    pub fn with_results(results: Vec<Result<String>>) -> Self {
        Self::from_script(Script::Queue(Mutex::new(results.into_iter().collect())))
    }

    /// Create a provider that computes each reply from the request.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&LLMRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self::from_script(Script::Responder(Arc::new(responder)))
    }

    fn from_script(script: Script) -> Self {
        Self {
            script,
            default_reply: "default response".to_string(),
            delay: None,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Reply used once the queue runs dry
    pub fn default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Simulated latency per call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Highest number of calls that were in progress at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, request: &LLMRequest) -> Result<String> {
        match &self.script {
            Script::Queue(queue) => {
                let mut queue = queue
                    .lock()
                    .map_err(|_| WeaveError::Other("scripted queue poisoned".to_string()))?;
                queue
                    .pop_front()
                    .unwrap_or_else(|| Ok(self.default_reply.clone()))
            }
            Script::Responder(responder) => responder(request),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.next_reply(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let content = reply?;
        let prompt_tokens = request
            .messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum();
        let completion_tokens = content.split_whitespace().count();

        Ok(LLMResponse {
            content,
            usage: Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "scripted".to_string(),
            model_name: "scripted".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_default() {
        let provider = ScriptedProvider::new(vec!["one", "two"]).default_reply("fallback");

        let mut replies = Vec::new();
        for _ in 0..3 {
            let response = provider
                .generate_request(&LLMRequest::from_prompt("hi"))
                .await
                .unwrap();
            replies.push(response.content);
        }

        assert_eq!(replies, vec!["one", "two", "fallback"]);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let provider = ScriptedProvider::with_results(vec![Err(WeaveError::Http(
            "connection refused".to_string(),
        ))]);

        let result = provider.generate_request(&LLMRequest::from_prompt("hi")).await;
        assert!(matches!(result, Err(WeaveError::Http(_))));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_responder_sees_request() {
        let provider =
            ScriptedProvider::with_responder(|req| Ok(format!("echo: {}", req.user_prompt())));

        let response = provider
            .generate_request(&LLMRequest::with_system_prompt("sys", "ping"))
            .await
            .unwrap();

        assert_eq!(response.content, "echo: ping");
        assert_eq!(response.usage.unwrap().completion_tokens, 2);
    }
}
