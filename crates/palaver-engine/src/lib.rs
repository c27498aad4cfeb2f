//! Completion engine abstraction for Palaver.
//!
//! The gateway talks to whatever generates text through [`CompletionEngine`]:
//! a narrow, prompt-in/text-out seam. The real implementation is
//! [`LlamaServerEngine`], an HTTP client for llama.cpp's `llama-server`;
//! [`StubEngine`] queues canned results for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod llama;

pub use llama::{LlamaServerConfig, LlamaServerEngine};

/// Sampling and length parameters for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    /// Sequences that terminate generation; the caller supplies the chat
    /// template's turn delimiter here.
    pub stop: Vec<String>,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.9,
            stop: Vec::new(),
        }
    }
}

/// Failure of an engine invocation.
///
/// Engine *unavailability* (never constructed at startup) is not represented
/// here; the gateway models it as the absence of an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("completion request failed: {0}")]
    Transport(reqwest::Error),

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed engine response: {0}")]
    Payload(String),

    #[error("failed to launch llama-server: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("engine not ready: {0}")]
    NotReady(String),

    #[error("stub engine has no queued completion")]
    StubQueueEmpty,
}

/// Text-completion capability invoked with a fully formatted prompt.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Generate a completion for `prompt`. Returns the raw generated text;
    /// callers decide how to trim and store it.
    async fn complete(&self, prompt: &str, params: &CompletionParams)
        -> Result<String, EngineError>;
}

/// Test double handing out queued results in FIFO order.
#[derive(Debug, Default)]
pub struct StubEngine {
    completions: Mutex<VecDeque<Result<String, EngineError>>>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, result: Result<String, EngineError>) {
        self.completions
            .lock()
            .expect("stub completion queue poisoned")
            .push_back(result);
    }
}

#[async_trait]
impl CompletionEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn complete(
        &self,
        _prompt: &str,
        _params: &CompletionParams,
    ) -> Result<String, EngineError> {
        self.completions
            .lock()
            .expect("stub completion queue poisoned")
            .pop_front()
            .unwrap_or(Err(EngineError::StubQueueEmpty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CompletionParams {
        CompletionParams {
            stop: vec!["<end_of_turn>".to_string()],
            ..CompletionParams::default()
        }
    }

    #[tokio::test]
    async fn stub_returns_queued_completion() {
        let engine = StubEngine::new();
        engine.enqueue(Ok("hello from stub".to_string()));

        let text = engine.complete("prompt", &params()).await.unwrap();

        assert_eq!(text, "hello from stub");
        assert_eq!(engine.name(), "stub");
    }

    #[tokio::test]
    async fn stub_returns_results_in_fifo_order() {
        let engine = StubEngine::new();
        engine.enqueue(Ok("first".to_string()));
        engine.enqueue(Ok("second".to_string()));

        assert_eq!(engine.complete("p", &params()).await.unwrap(), "first");
        assert_eq!(engine.complete("p", &params()).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn stub_surfaces_queued_error() {
        let engine = StubEngine::new();
        engine.enqueue(Err(EngineError::NotReady("loading".to_string())));

        let err = engine.complete("p", &params()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotReady(_)));
    }

    #[tokio::test]
    async fn stub_reports_exhausted_queue() {
        let engine = StubEngine::new();

        let err = engine.complete("p", &params()).await.unwrap_err();
        assert!(matches!(err, EngineError::StubQueueEmpty));
    }

    #[test]
    fn default_params_match_fixed_generation_settings() {
        let p = CompletionParams::default();
        assert_eq!(p.max_tokens, 4096);
        assert_eq!(p.temperature, 0.7);
        assert_eq!(p.top_k, 40);
        assert_eq!(p.top_p, 0.9);
        assert!(p.stop.is_empty());
    }
}
