//! Scenario inputs: what a simulation is asked to do and how it is graded.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Order;
use crate::error::{Result, VendError};
use crate::message::{JsonMap, Message, ToolCall};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requestor {
    Assistant,
    User,
}

impl Default for Requestor {
    fn default() -> Self {
        Self::Assistant
    }
}

/// The expected counterpart of a [`ToolCall`] in a task script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_id: String,
    #[serde(default)]
    pub requestor: Requestor,
    pub name: String,
    pub arguments: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Argument names to compare against a tool call. `None` compares all
    /// of the call's arguments; an empty list compares nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_args: Option<Vec<String>>,
}

impl Action {
    pub fn compare_with_tool_call(&self, tool_call: &ToolCall) -> bool {
        if self.name != tool_call.name {
            return false;
        }
        let compare_args: Vec<String> = match &self.compare_args {
            Some(names) => names.clone(),
            None => tool_call.arguments.keys().cloned().collect(),
        };
        if compare_args.is_empty() {
            return true;
        }
        compare_args
            .iter()
            .all(|name| tool_call.arguments.get(name) == self.arguments.get(name))
    }

    pub fn func_format(&self) -> String {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}({})", self.name, args.join(", "))
    }
}

/// Everything the user simulator is told about who it is playing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserScenario {
    pub user_profile: JsonMap,
}

/// Expected final state for evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_orders: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_orders: Option<Vec<Order>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_rubrics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_states: Option<Vec<ExpectedState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_rubrics: Option<Vec<String>>,
}

impl EvaluationCriteria {
    /// State rubrics followed by overall rubrics, in declaration order.
    pub fn all_rubrics(&self) -> Vec<String> {
        let mut rubrics = Vec::new();
        if let Some(states) = &self.expected_states {
            for state in states {
                if let Some(state_rubrics) = &state.state_rubrics {
                    rubrics.extend(state_rubrics.iter().cloned());
                }
            }
        }
        if let Some(overall) = &self.overall_rubrics {
            rubrics.extend(overall.iter().cloned());
        }
        rubrics
    }

    pub fn info(&self) -> JsonMap {
        let mut info = JsonMap::new();
        info.insert(
            "num_expected_states".into(),
            self.expected_states.as_ref().map_or(0, Vec::len).into(),
        );
        info.insert(
            "num_overall_rubrics".into(),
            self.overall_rubrics.as_ref().map_or(0, Vec::len).into(),
        );
        info
    }
}

/// One immutable scenario: user profile, agent instructions, initial
/// environment and (optionally) how to grade the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub domain: String,
    /// The initial environment blob the domain DB is built from.
    #[serde(default)]
    pub environment: Value,
    pub user_scenario: UserScenario,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_criteria: Option<EvaluationCriteria>,
    /// Seeded conversation. The last message must be from the user or the
    /// agent; it decides who opens the live conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_history: Option<Vec<Message>>,
}

pub fn make_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn make_task(user_instructions: &str, eval_criteria: EvaluationCriteria) -> Task {
    let mut profile = JsonMap::new();
    profile.insert("instructions".into(), user_instructions.into());
    Task {
        id: make_task_id(),
        domain: String::new(),
        environment: Value::Null,
        user_scenario: UserScenario {
            user_profile: profile,
        },
        instructions: String::new(),
        evaluation_criteria: Some(eval_criteria),
        message_history: None,
    }
}

/// Load a task file: a JSON array of [`Task`] objects.
pub fn load_tasks(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let tasks: Vec<Task> = serde_json::from_str(&raw)?;
    for task in &tasks {
        if let Some(history) = &task.message_history {
            if let Some(last) = history.last() {
                if !last.is_user() && !last.is_assistant() {
                    return Err(VendError::InvalidTask(format!(
                        "task {}: seeded history must end with a user or agent message",
                        task.id
                    )));
                }
            }
        }
    }
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: Some("call_1".into()),
            name: name.into(),
            arguments: args.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn compare_all_args_by_default() {
        let action = Action {
            action_id: "a1".into(),
            requestor: Requestor::Assistant,
            name: "pay_delivery_order".into(),
            arguments: json!({"order_id": "OT123"}).as_object().cloned().unwrap(),
            info: None,
            compare_args: None,
        };
        assert!(action.compare_with_tool_call(&call("pay_delivery_order", json!({"order_id": "OT123"}))));
        assert!(!action.compare_with_tool_call(&call("pay_delivery_order", json!({"order_id": "OT999"}))));
        assert!(!action.compare_with_tool_call(&call("cancel_delivery_order", json!({"order_id": "OT123"}))));
    }

    #[test]
    fn compare_only_listed_args() {
        let action = Action {
            action_id: "a2".into(),
            requestor: Requestor::Assistant,
            name: "create_delivery_order".into(),
            arguments: json!({"user_id": "u1", "note": "spicy"}).as_object().cloned().unwrap(),
            info: None,
            compare_args: Some(vec!["user_id".into()]),
        };
        let tc = call("create_delivery_order", json!({"user_id": "u1", "note": "mild"}));
        assert!(action.compare_with_tool_call(&tc));
    }

    #[test]
    fn empty_compare_args_always_matches() {
        let action = Action {
            action_id: "a3".into(),
            requestor: Requestor::User,
            name: "weather".into(),
            arguments: JsonMap::new(),
            info: None,
            compare_args: Some(vec![]),
        };
        assert!(action.compare_with_tool_call(&call("weather", json!({"address": "anywhere"}))));
    }
}
