//! The conversational units exchanged between agent, user and tools.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;

/// Token counts for one LLM call, accumulated per side over a trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
        }
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// A tool invocation requested by the LLM. The id is opaque and assigned
/// by the model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: Option<String>,
    pub name: String,
    pub arguments: JsonMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub content: String,
}

/// A simulated-customer turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// An agent turn: plain content, tool calls, or (malformed) neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Raw provider payload, kept for reasoning-content passthrough.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
}

impl AssistantMessage {
    pub fn is_tool_call(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    pub fn has_content(&self) -> bool {
        self.content.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// The response to a single tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMessage {
    pub id: Option<String>,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub error: bool,
}

/// Groups the responses of one assistant turn's tool calls so they can be
/// fed back to the agent in a single step. Not stored in trajectories —
/// members are appended individually, in call order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiToolMessage {
    pub tool_messages: Vec<ToolMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System(SystemMessage),
    User(UserMessage),
    Assistant(AssistantMessage),
    Tool(ToolMessage),
}

impl Message {
    pub fn role(&self) -> &'static str {
        match self {
            Message::System(_) => "system",
            Message::User(_) => "user",
            Message::Assistant(_) => "assistant",
            Message::Tool(_) => "tool",
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User(_))
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Message::Assistant(_))
    }

    /// A short plain-text rendering used in judge prompts.
    pub fn display_line(&self) -> String {
        match self {
            Message::System(m) => format!("system: {}", m.content),
            Message::User(m) => format!("user: {}", m.content),
            Message::Assistant(m) => {
                let mut parts = Vec::new();
                if let Some(content) = &m.content {
                    if !content.is_empty() {
                        parts.push(content.clone());
                    }
                }
                if let Some(calls) = &m.tool_calls {
                    for call in calls {
                        parts.push(format!(
                            "{}({})",
                            call.name,
                            serde_json::to_string(&call.arguments).unwrap_or_default()
                        ));
                    }
                }
                format!("assistant: {}", parts.join(" "))
            }
            Message::Tool(m) => format!("tool[{}]: {}", m.name, m.content),
        }
    }
}

/// Sum (agent_cost, user_cost) over a trajectory. Returns `None` when any
/// agent or user message is missing its cost, so an incomplete total is
/// never mistaken for a real one.
pub fn get_cost(messages: &[Message]) -> Option<(f64, f64)> {
    let mut agent_cost = 0.0;
    let mut user_cost = 0.0;
    for message in messages {
        match message {
            Message::Assistant(m) => {
                agent_cost += m.cost?;
            }
            Message::User(m) => {
                user_cost += m.cost?;
            }
            Message::Tool(_) | Message::System(_) => {}
        }
    }
    Some((agent_cost, user_cost))
}

/// Accumulated (agent_usage, user_usage) over a trajectory.
pub fn get_usage(messages: &[Message]) -> (TokenUsage, TokenUsage) {
    let mut agent = TokenUsage::default();
    let mut user = TokenUsage::default();
    for message in messages {
        match message {
            Message::Assistant(m) => {
                if let Some(usage) = m.usage {
                    agent.add(usage);
                }
            }
            Message::User(m) => {
                if let Some(usage) = m.usage {
                    user.add(usage);
                }
            }
            _ => {}
        }
    }
    (agent, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_round_trips_with_role_tag() {
        let msg = Message::Assistant(AssistantMessage {
            content: Some("hello".into()),
            tool_calls: None,
            cost: Some(0.001),
            usage: Some(TokenUsage::new(10, 5)),
            raw_data: None,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn cost_is_none_when_any_message_lacks_cost() {
        let messages = vec![
            Message::User(UserMessage {
                content: "hi".into(),
                cost: Some(0.5),
                usage: None,
            }),
            Message::Assistant(AssistantMessage {
                content: Some("hello".into()),
                ..Default::default()
            }),
        ];
        assert_eq!(get_cost(&messages), None);
    }

    #[test]
    fn cost_splits_by_side() {
        let messages = vec![
            Message::User(UserMessage {
                content: "hi".into(),
                cost: Some(0.5),
                usage: None,
            }),
            Message::Assistant(AssistantMessage {
                content: Some("hello".into()),
                cost: Some(0.25),
                ..Default::default()
            }),
            Message::Tool(ToolMessage {
                id: None,
                name: "weather".into(),
                content: "sunny".into(),
                error: false,
            }),
        ];
        assert_eq!(get_cost(&messages), Some((0.25, 0.5)));
    }
}
