//! The simulated customer: an LLM persona built from the task's user
//! profile. It has no tools and signals completion with a stop token.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Language;
use crate::error::Result;
use crate::llm::{ChatRequest, LlmService};
use crate::message::{AssistantMessage, Message, SystemMessage, UserMessage};
use crate::task::UserScenario;

/// Emitted by the simulated user (and the solo agent) when the task is
/// considered complete.
pub const STOP_TOKEN: &str = "###STOP###";

#[derive(Debug, Clone, Default)]
pub struct UserState {
    pub system_prompt: String,
    /// Conversation in trajectory orientation (user = simulated
    /// customer); flipped when calling the simulator's own LLM.
    pub messages: Vec<Message>,
}

/// Common surface of the user implementations.
#[async_trait]
pub trait User: Send + Sync {
    fn init_state(&self, message_history: Option<Vec<Message>>) -> UserState;

    async fn generate_next(
        &self,
        assistant_message: Option<&AssistantMessage>,
        state: &mut UserState,
    ) -> Result<UserMessage>;

    fn set_seed(&mut self, _seed: u64) {}
}

pub struct UserSimulator {
    llm: Arc<dyn LlmService>,
    model: String,
    scenario: UserScenario,
    language: Language,
    seed: Option<u64>,
}

impl UserSimulator {
    pub fn new(
        llm: Arc<dyn LlmService>,
        model: impl Into<String>,
        scenario: UserScenario,
        language: Language,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            scenario,
            language,
            seed: None,
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    pub fn system_prompt(&self) -> String {
        let profile =
            serde_json::to_string_pretty(&self.scenario.user_profile).unwrap_or_default();
        match self.language {
            Language::English => format!(
                "You are playing a customer talking to a customer-service agent.\n\
                 Stay in character and pursue the goals below one step at a time; never reveal \
                 that you are simulated and never act as the agent.\n\
                 Your profile and situation:\n{profile}\n\
                 When every goal is handled (or clearly impossible), reply with exactly {STOP_TOKEN}."
            ),
            Language::Chinese => format!(
                "你正在扮演一位与客服对话的顾客。\n\
                 请始终保持角色，按以下设定逐步完成你的目标；不要透露你是模拟用户，也不要替客服说话。\n\
                 你的人物设定与情境：\n{profile}\n\
                 当所有目标都已完成（或明确无法完成）时，只回复 {STOP_TOKEN}。"
            ),
        }
    }

    pub fn init_state(&self, message_history: Option<Vec<Message>>) -> UserState {
        UserState {
            system_prompt: self.system_prompt(),
            messages: message_history.unwrap_or_default(),
        }
    }

    pub fn is_stop(message: &UserMessage) -> bool {
        message.content.contains(STOP_TOKEN)
    }

    /// The simulator plays the "assistant" on its own wire: the real
    /// agent's words arrive as user turns, and its previous outputs as
    /// assistant turns. Tool traffic is invisible to it.
    fn flipped_messages(&self, state: &UserState) -> Vec<Message> {
        let mut flipped = vec![Message::System(SystemMessage {
            content: state.system_prompt.clone(),
        })];
        for message in &state.messages {
            match message {
                Message::User(m) => flipped.push(Message::Assistant(AssistantMessage {
                    content: Some(m.content.clone()),
                    ..Default::default()
                })),
                Message::Assistant(m) => {
                    if let Some(content) = &m.content {
                        if !content.is_empty() {
                            flipped.push(Message::User(UserMessage {
                                content: content.clone(),
                                cost: None,
                                usage: None,
                            }));
                        }
                    }
                }
                Message::Tool(_) | Message::System(_) => {}
            }
        }
        flipped
    }

    /// Produce the customer's next turn given the agent's latest reply.
    pub async fn generate_next(
        &self,
        assistant_message: Option<&AssistantMessage>,
        state: &mut UserState,
    ) -> Result<UserMessage> {
        if let Some(message) = assistant_message {
            state.messages.push(Message::Assistant(message.clone()));
        }
        let request =
            ChatRequest::new(&self.model, self.flipped_messages(state)).with_seed(self.seed);
        let reply = self.llm.complete(request).await?;
        let user_message = UserMessage {
            content: reply.content.unwrap_or_default(),
            cost: reply.cost,
            usage: reply.usage,
        };
        state.messages.push(Message::User(user_message.clone()));
        Ok(user_message)
    }
}

#[async_trait]
impl User for UserSimulator {
    fn init_state(&self, message_history: Option<Vec<Message>>) -> UserState {
        UserSimulator::init_state(self, message_history)
    }

    async fn generate_next(
        &self,
        assistant_message: Option<&AssistantMessage>,
        state: &mut UserState,
    ) -> Result<UserMessage> {
        UserSimulator::generate_next(self, assistant_message, state).await
    }

    fn set_seed(&mut self, seed: u64) {
        UserSimulator::set_seed(self, seed);
    }
}

/// A non-LLM user for smoke tests and solo-agent runs: states its
/// request once, then stops.
pub struct DummyUser {
    opener: String,
    turns: std::sync::atomic::AtomicUsize,
}

impl DummyUser {
    pub fn new(opener: impl Into<String>) -> Self {
        Self {
            opener: opener.into(),
            turns: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub async fn generate_next(
        &self,
        assistant_message: Option<&AssistantMessage>,
        state: &mut UserState,
    ) -> Result<UserMessage> {
        if let Some(message) = assistant_message {
            state.messages.push(Message::Assistant(message.clone()));
        }
        let turn = self
            .turns
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let content = if turn == 0 {
            self.opener.clone()
        } else {
            STOP_TOKEN.to_string()
        };
        let user_message = UserMessage {
            content,
            cost: Some(0.0),
            usage: None,
        };
        state.messages.push(Message::User(user_message.clone()));
        Ok(user_message)
    }
}

#[async_trait]
impl User for DummyUser {
    fn init_state(&self, message_history: Option<Vec<Message>>) -> UserState {
        UserState {
            system_prompt: String::new(),
            messages: message_history.unwrap_or_default(),
        }
    }

    async fn generate_next(
        &self,
        assistant_message: Option<&AssistantMessage>,
        state: &mut UserState,
    ) -> Result<UserMessage> {
        DummyUser::generate_next(self, assistant_message, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::message::JsonMap;

    fn simulator(responses: Vec<std::result::Result<AssistantMessage, String>>) -> UserSimulator {
        let mut profile = JsonMap::new();
        profile.insert("instructions".into(), "order dinner".into());
        UserSimulator::new(
            Arc::new(MockLlm::new(responses)),
            "gpt-4.1",
            UserScenario {
                user_profile: profile,
            },
            Language::English,
        )
    }

    #[test]
    fn system_prompt_embeds_profile_and_stop_token() {
        let sim = simulator(vec![]);
        let prompt = sim.system_prompt();
        assert!(prompt.contains("order dinner"));
        assert!(prompt.contains(STOP_TOKEN));
    }

    #[tokio::test]
    async fn roles_are_flipped_for_the_simulator() {
        let sim = simulator(vec![MockLlm::text("I'd like some hotpot.")]);
        let mut state = sim.init_state(None);
        let agent_reply = AssistantMessage {
            content: Some("How can I help you today?".into()),
            ..Default::default()
        };
        let message = sim
            .generate_next(Some(&agent_reply), &mut state)
            .await
            .unwrap();
        assert_eq!(message.content, "I'd like some hotpot.");
        // State keeps trajectory orientation.
        assert!(state.messages[0].is_assistant());
        assert!(state.messages[1].is_user());
    }

    #[tokio::test]
    async fn dummy_user_stops_on_second_turn() {
        let user = DummyUser::new("book a table");
        let mut state = UserState::default();
        let first = user.generate_next(None, &mut state).await.unwrap();
        assert_eq!(first.content, "book a table");
        let second = user.generate_next(None, &mut state).await.unwrap();
        assert!(UserSimulator::is_stop(&second));
    }
}
