//! Scripted LLM for tests. No network calls are made anywhere near it.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, VendError};
use crate::llm::{ChatRequest, LlmService};
use crate::message::{AssistantMessage, JsonMap, ToolCall};

type Scripted = std::result::Result<AssistantMessage, String>;

pub struct MockLlm {
    responses: Mutex<VecDeque<Scripted>>,
    call_log: Mutex<Vec<(String, usize)>>, // (model, message count)
}

impl MockLlm {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// A reply with plain content.
    pub fn text(content: impl Into<String>) -> Scripted {
        Ok(AssistantMessage {
            content: Some(content.into()),
            cost: Some(0.0),
            ..Default::default()
        })
    }

    /// A reply carrying a single tool call.
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Scripted {
        Ok(AssistantMessage {
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: Some("call_mock".into()),
                name: name.into(),
                arguments: arguments.as_object().cloned().unwrap_or_else(JsonMap::new),
            }]),
            cost: Some(0.0),
            ..Default::default()
        })
    }

    /// A reply that is neither content nor a tool call (malformed).
    pub fn empty() -> Scripted {
        Ok(AssistantMessage {
            cost: Some(0.0),
            ..Default::default()
        })
    }

    /// A scripted transport failure.
    pub fn failure(error: impl Into<String>) -> Scripted {
        Err(error.into())
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// The model string passed to the Nth call (0-indexed).
    pub fn model_for_call(&self, n: usize) -> Option<String> {
        self.call_log
            .lock()
            .unwrap()
            .get(n)
            .map(|(model, _)| model.clone())
    }

    pub fn messages_for_call(&self, n: usize) -> Option<usize> {
        self.call_log.lock().unwrap().get(n).map(|(_, count)| *count)
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantMessage> {
        self.call_log
            .lock()
            .unwrap()
            .push((request.model.clone(), request.messages.len()));
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(message)) => Ok(message),
            Some(Err(error)) => Err(VendError::Llm(error)),
            None => Err(VendError::Llm(
                "MockLlm: no more programmed responses".into(),
            )),
        }
    }
}
