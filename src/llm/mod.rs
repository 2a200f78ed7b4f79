//! The single interface between the harness and any LLM provider.
//!
//! Agents, user simulators and judges all speak [`LlmService`]; the
//! production implementation is the OpenAI-compatible [`HttpLlm`], and
//! tests script a [`MockLlm`].

mod http;
mod mock;

pub use http::HttpLlm;
pub use mock::MockLlm;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::message::{AssistantMessage, Message};

/// One chat-completion request. `model` names an entry of the model
/// configuration; `seed` overrides the configured seed for trial-level
/// determinism.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Option<Vec<Value>>,
    pub tool_choice: Option<String>,
    pub seed: Option<u64>,
    pub enable_prompt_caching: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
            seed: None,
            enable_prompt_caching: false,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        if !tools.is_empty() {
            if self.tool_choice.is_none() {
                self.tool_choice = Some("auto".to_string());
            }
            self.tools = Some(tools);
        }
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_prompt_caching(mut self) -> Self {
        self.enable_prompt_caching = true;
        self
    }
}

/// # Contract
/// - Must be `Send + Sync` (shared behind `Arc<dyn LlmService>`).
/// - Returns `Ok` for any well-formed assistant turn, including tool
///   calls.
/// - Returns `Err` only for unrecoverable failures: transport errors
///   after retries, or an unparseable provider response.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantMessage>;
}
