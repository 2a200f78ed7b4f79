//! The LLM agent driver: system-prompt assembly, message history, and
//! the call into the model service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Language;
use crate::error::{Result, VendError};
use crate::llm::{ChatRequest, LlmService};
use crate::message::{AssistantMessage, Message, MultiToolMessage, ToolMessage, UserMessage};
use crate::user::STOP_TOKEN;
use crate::utils::get_weekday;

/// Messages an agent can receive mid-conversation.
#[derive(Debug, Clone)]
pub enum AgentIncoming {
    User(UserMessage),
    Tool(ToolMessage),
    MultiTool(MultiToolMessage),
}

/// The agent's conversational state: its system prompt plus everything
/// exchanged so far.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub system_prompt: String,
    pub messages: Vec<Message>,
}

impl AgentState {
    fn push_incoming(&mut self, incoming: AgentIncoming) {
        match incoming {
            AgentIncoming::User(message) => self.messages.push(Message::User(message)),
            AgentIncoming::Tool(message) => self.messages.push(Message::Tool(message)),
            AgentIncoming::MultiTool(batch) => self
                .messages
                .extend(batch.tool_messages.into_iter().map(Message::Tool)),
        }
    }

    fn request_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::System(crate::message::SystemMessage {
            content: self.system_prompt.clone(),
        }));
        messages.extend(self.messages.iter().cloned());
        messages
    }
}

/// Common surface of the agent implementations, so the orchestrator and
/// registry can drive either interchangeably.
#[async_trait]
pub trait Agent: Send + Sync {
    fn init_state(&self, message_history: Option<Vec<Message>>) -> Result<AgentState>;

    async fn generate_next(
        &self,
        incoming: Option<AgentIncoming>,
        state: &mut AgentState,
    ) -> Result<AssistantMessage>;

    fn set_seed(&mut self, seed: u64);
}

#[async_trait]
impl Agent for LlmAgent {
    fn init_state(&self, message_history: Option<Vec<Message>>) -> Result<AgentState> {
        LlmAgent::init_state(self, message_history)
    }

    async fn generate_next(
        &self,
        incoming: Option<AgentIncoming>,
        state: &mut AgentState,
    ) -> Result<AssistantMessage> {
        LlmAgent::generate_next(self, incoming, state).await
    }

    fn set_seed(&mut self, seed: u64) {
        LlmAgent::set_seed(self, seed);
    }
}

#[async_trait]
impl Agent for LlmSoloAgent {
    fn init_state(&self, message_history: Option<Vec<Message>>) -> Result<AgentState> {
        LlmSoloAgent::init_state(self, message_history)
    }

    async fn generate_next(
        &self,
        incoming: Option<AgentIncoming>,
        state: &mut AgentState,
    ) -> Result<AssistantMessage> {
        LlmSoloAgent::generate_next(self, incoming, state).await
    }

    fn set_seed(&mut self, seed: u64) {
        LlmSoloAgent::set_seed(self, seed);
    }
}

fn is_valid_history_message(message: &Message) -> bool {
    matches!(
        message,
        Message::Assistant(_) | Message::User(_) | Message::Tool(_)
    )
}

pub struct LlmAgent {
    llm: Arc<dyn LlmService>,
    model: String,
    tool_schemas: Vec<Value>,
    domain_policy: String,
    /// Simulated time plus the localized weekday, substituted for the
    /// policy's `{time}` placeholder.
    time: String,
    seed: Option<u64>,
}

impl LlmAgent {
    /// `time` is a hard precondition: the policy is anchored to the
    /// simulated clock, so construction fails without one.
    pub fn new(
        llm: Arc<dyn LlmService>,
        model: impl Into<String>,
        tool_schemas: Vec<Value>,
        domain_policy: impl Into<String>,
        time: &str,
        language: Language,
    ) -> Result<Self> {
        if time.is_empty() {
            return Err(VendError::Config(
                "agent requires the simulated time to build its system prompt".into(),
            ));
        }
        Ok(Self {
            llm,
            model: model.into(),
            tool_schemas,
            domain_policy: domain_policy.into(),
            time: format!("{time} {}", get_weekday(time, language)),
            seed: None,
        })
    }

    pub fn system_prompt(&self) -> String {
        self.domain_policy.replace("{time}", &self.time)
    }

    /// Build the initial state, validating any seeded history.
    pub fn init_state(&self, message_history: Option<Vec<Message>>) -> Result<AgentState> {
        let messages = message_history.unwrap_or_default();
        if !messages.iter().all(is_valid_history_message) {
            return Err(VendError::InvalidTask(
                "message history must contain only assistant, user, or tool messages".into(),
            ));
        }
        Ok(AgentState {
            system_prompt: self.system_prompt(),
            messages,
        })
    }

    pub fn set_seed(&mut self, seed: u64) {
        if let Some(current) = self.seed {
            tracing::warn!(current, seed, "seed is already set, resetting it");
        }
        self.seed = Some(seed);
    }

    /// Respond to a user or tool message: append it, call the model with
    /// system + history + tools, append and return the reply.
    pub async fn generate_next(
        &self,
        incoming: Option<AgentIncoming>,
        state: &mut AgentState,
    ) -> Result<AssistantMessage> {
        if let Some(incoming) = incoming {
            state.push_incoming(incoming);
        }
        let request = ChatRequest::new(&self.model, state.request_messages())
            .with_tools(self.tool_schemas.clone())
            .with_seed(self.seed)
            .with_prompt_caching();
        let assistant_message = self.llm.complete(request).await?;
        state
            .messages
            .push(Message::Assistant(assistant_message.clone()));
        Ok(assistant_message)
    }
}

/// An agent that works a ticket alone, with no simulated customer: every
/// turn must be a tool call until it emits the stop token.
pub struct LlmSoloAgent {
    inner: LlmAgent,
}

impl LlmSoloAgent {
    pub fn new(
        llm: Arc<dyn LlmService>,
        model: impl Into<String>,
        tool_schemas: Vec<Value>,
        domain_policy: impl Into<String>,
        time: &str,
        language: Language,
    ) -> Result<Self> {
        Ok(Self {
            inner: LlmAgent::new(llm, model, tool_schemas, domain_policy, time, language)?,
        })
    }

    pub fn is_stop(message: &AssistantMessage) -> bool {
        message
            .content
            .as_ref()
            .is_some_and(|content| content.contains(STOP_TOKEN))
    }

    pub fn init_state(&self, message_history: Option<Vec<Message>>) -> Result<AgentState> {
        self.inner.init_state(message_history)
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.inner.set_seed(seed);
    }

    pub async fn generate_next(
        &self,
        incoming: Option<AgentIncoming>,
        state: &mut AgentState,
    ) -> Result<AssistantMessage> {
        let assistant_message = self.inner.generate_next(incoming, state).await?;
        if !assistant_message.is_tool_call() && !Self::is_stop(&assistant_message) {
            return Err(VendError::InvalidAgentMessage(
                "LLMSoloAgent only supports tool calls before ###STOP###.".into(),
            ));
        }
        Ok(assistant_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn agent_with(responses: Vec<std::result::Result<AssistantMessage, String>>) -> LlmAgent {
        LlmAgent::new(
            Arc::new(MockLlm::new(responses)),
            "gpt-4.1",
            vec![],
            "Current time: {time}.",
            "2025-08-01 10:00:00",
            Language::English,
        )
        .unwrap()
    }

    #[test]
    fn system_prompt_includes_time_and_weekday() {
        let agent = agent_with(vec![]);
        let prompt = agent.system_prompt();
        assert_eq!(prompt, "Current time: 2025-08-01 10:00:00 Friday.");
    }

    #[test]
    fn empty_time_is_a_construction_error() {
        let result = LlmAgent::new(
            Arc::new(MockLlm::new(vec![])),
            "gpt-4.1",
            vec![],
            "policy",
            "",
            Language::English,
        );
        assert!(matches!(result, Err(VendError::Config(_))));
    }

    #[tokio::test]
    async fn generate_next_appends_both_sides_to_history() {
        let agent = agent_with(vec![MockLlm::text("Happy to help.")]);
        let mut state = agent.init_state(None).unwrap();
        let reply = agent
            .generate_next(
                Some(AgentIncoming::User(UserMessage {
                    content: "hi".into(),
                    cost: None,
                    usage: None,
                })),
                &mut state,
            )
            .await
            .unwrap();
        assert_eq!(reply.content.as_deref(), Some("Happy to help."));
        assert_eq!(state.messages.len(), 2);
        assert!(state.messages[0].is_user());
        assert!(state.messages[1].is_assistant());
    }

    #[tokio::test]
    async fn solo_agent_rejects_plain_reply_without_stop() {
        let solo = LlmSoloAgent::new(
            Arc::new(MockLlm::new(vec![MockLlm::text("just chatting")])),
            "gpt-4.1",
            vec![],
            "policy {time}",
            "2025-08-01 10:00:00",
            Language::English,
        )
        .unwrap();
        let mut state = solo.init_state(None).unwrap();
        let err = solo.generate_next(None, &mut state).await.unwrap_err();
        assert!(matches!(err, VendError::InvalidAgentMessage(_)));
    }

    #[tokio::test]
    async fn solo_agent_accepts_stop_token() {
        let solo = LlmSoloAgent::new(
            Arc::new(MockLlm::new(vec![MockLlm::text("all done ###STOP###")])),
            "gpt-4.1",
            vec![],
            "policy {time}",
            "2025-08-01 10:00:00",
            Language::English,
        )
        .unwrap();
        let mut state = solo.init_state(None).unwrap();
        let reply = solo.generate_next(None, &mut state).await.unwrap();
        assert!(LlmSoloAgent::is_stop(&reply));
    }
}
