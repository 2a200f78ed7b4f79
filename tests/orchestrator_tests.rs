//! Integration tests for the simulation step loop.
//!
//! All tests use `MockLlm` — no network calls are made.

use std::sync::Arc;

use serde_json::json;
use vendsim::{
    build_environment, AssistantMessage, Language, LlmAgent, Message, MockLlm, Orchestrator,
    SimulationLimits, TerminationReason, UserMessage, UserSimulator,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test helpers
// ─────────────────────────────────────────────────────────────────────────────

type Scripted = Result<AssistantMessage, String>;

fn delivery_blob() -> serde_json::Value {
    json!({
        "time": "2025-08-01 10:00:00",
        "user_id": "user_001",
        "location": [
            {"address": "1 River Road", "longitude": 120.16, "latitude": 30.25}
        ],
        "stores": {
            "S001": {
                "store_id": "S001",
                "name": "Golden Wok",
                "score": 4.7,
                "location": {"address": "8 Lake Street", "longitude": 120.15, "latitude": 30.25},
                "tags": ["chinese", "wok"],
                "products": [
                    {
                        "product_id": "P001",
                        "name": "Kung Pao Chicken",
                        "store_id": "S001",
                        "store_name": "Golden Wok",
                        "price": 32.0,
                        "quantity": 100,
                        "attributes": "",
                        "tags": ["spicy"]
                    }
                ]
            }
        }
    })
}

fn make_agent(responses: Vec<Scripted>) -> LlmAgent {
    LlmAgent::new(
        Arc::new(MockLlm::new(responses)),
        "agent-model",
        vec![],
        "You are a helpful agent. Time: {time}.",
        "2025-08-01 10:00:00",
        Language::English,
    )
    .expect("agent should build")
}

fn make_user(responses: Vec<Scripted>) -> UserSimulator {
    let mut profile = serde_json::Map::new();
    profile.insert("instructions".into(), "order kung pao chicken".into());
    UserSimulator::new(
        Arc::new(MockLlm::new(responses)),
        "user-model",
        vendsim::UserScenario {
            user_profile: profile,
        },
        Language::English,
    )
}

fn make_task(history: Option<Vec<Message>>) -> vendsim::Task {
    vendsim::Task {
        id: "task_delivery_001".into(),
        domain: "delivery".into(),
        environment: delivery_blob(),
        user_scenario: vendsim::UserScenario::default(),
        instructions: String::new(),
        evaluation_criteria: None,
        message_history: history,
    }
}

fn limits(max_steps: usize, max_errors: usize) -> SimulationLimits {
    SimulationLimits {
        max_steps,
        max_errors,
        max_duration: None,
    }
}

async fn run(
    task: &vendsim::Task,
    agent: &LlmAgent,
    user: &UserSimulator,
    limits: SimulationLimits,
) -> vendsim::SimulationRun {
    let mut env = build_environment("delivery", &task.environment, Language::English).unwrap();
    Orchestrator::new(limits)
        .run_simulation(task, agent, user, &mut env, 0, 300)
        .await
        .expect("simulation should reach a terminal state")
}

// ─────────────────────────────────────────────────────────────────────────────
// Happy path: user opens, agent answers, user stops
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_opens_and_stop_token_ends_the_run() {
    let agent = make_agent(vec![MockLlm::text("We have Kung Pao Chicken for 32 yuan.")]);
    let user = make_user(vec![
        MockLlm::text("What can I order from Golden Wok?"),
        MockLlm::text("Great, that's all. ###STOP###"),
    ]);
    let task = make_task(None);

    let sim = run(&task, &agent, &user, limits(300, 10)).await;

    assert_eq!(sim.termination_reason, TerminationReason::UserStop);
    assert_eq!(sim.messages.len(), 3);
    assert!(sim.messages[0].is_user());
    assert!(sim.messages[1].is_assistant());
    assert!(sim.messages[2].is_user());
    assert_eq!(sim.task_id, "task_delivery_001");
    assert!(!sim.db_hash.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool chaining: the agent keeps its turn across a tool batch
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tool_calls_are_executed_and_fed_back_in_order() {
    let agent = make_agent(vec![
        {
            // Two calls in one assistant turn; responses must keep order.
            let mut message = AssistantMessage::default();
            message.cost = Some(0.0);
            message.tool_calls = Some(vec![
                vendsim::ToolCall {
                    id: Some("call_a".into()),
                    name: "get_delivery_store_info".into(),
                    arguments: json!({"store_id": "S001"}).as_object().cloned().unwrap(),
                },
                vendsim::ToolCall {
                    id: Some("call_b".into()),
                    name: "get_delivery_order_status".into(),
                    arguments: json!({"order_id": "OT_missing"}).as_object().cloned().unwrap(),
                },
            ]);
            Ok(message)
        },
        MockLlm::text("The store is open; you have no such order."),
    ]);
    let user = make_user(vec![
        MockLlm::text("Tell me about store S001 and my order OT_missing."),
        MockLlm::text("###STOP###"),
    ]);
    let task = make_task(None);

    let sim = run(&task, &agent, &user, limits(300, 10)).await;

    assert_eq!(sim.termination_reason, TerminationReason::UserStop);
    let tool_messages: Vec<_> = sim
        .messages
        .iter()
        .filter_map(|m| match m {
            Message::Tool(t) => Some(t),
            _ => None,
        })
        .collect();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0].id.as_deref(), Some("call_a"));
    assert_eq!(tool_messages[1].id.as_deref(), Some("call_b"));
    assert!(tool_messages[0].content.contains("Golden Wok"));
    assert!(tool_messages[1].content.contains("not found"));
    // A missing order is a precondition message, not a system error.
    assert!(!tool_messages[1].error);
}

// ─────────────────────────────────────────────────────────────────────────────
// Step limit: max_steps = 0 terminates before any turn
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn zero_max_steps_terminates_immediately() {
    let agent = make_agent(vec![]);
    let user = make_user(vec![]);
    let task = make_task(None);

    let sim = run(&task, &agent, &user, limits(0, 10)).await;

    assert_eq!(sim.termination_reason, TerminationReason::MaxSteps);
    assert!(sim.messages.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Step limit exhaustion with a tool-happy agent
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn step_limit_ends_a_tool_looping_agent() {
    let tool_turn = || {
        MockLlm::tool_call("get_delivery_store_info", json!({"store_id": "S001"}))
    };
    let agent = make_agent(vec![tool_turn(), tool_turn(), tool_turn()]);
    let user = make_user(vec![MockLlm::text("Keep checking the store.")]);
    let task = make_task(None);

    let sim = run(&task, &agent, &user, limits(2, 10)).await;

    assert_eq!(sim.termination_reason, TerminationReason::MaxSteps);
    // One user turn + one agent turn hit the cap.
    assert!(sim.messages.iter().filter(|m| m.is_assistant()).count() <= 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Error budget: an unknown tool is an error turn
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_unknown_tool_trips_a_zero_error_budget() {
    let agent = make_agent(vec![MockLlm::tool_call("warp_drive", json!({}))]);
    let user = make_user(vec![MockLlm::text("Please do something impossible.")]);
    let task = make_task(None);

    let sim = run(&task, &agent, &user, limits(300, 0)).await;

    assert_eq!(sim.termination_reason, TerminationReason::TooManyErrors);
    let tool_message = sim
        .messages
        .iter()
        .find_map(|m| match m {
            Message::Tool(t) => Some(t),
            _ => None,
        })
        .expect("the failed call is still recorded");
    assert_eq!(tool_message.content, "Tool 'warp_drive' not found");
    assert!(tool_message.error);
}

// ─────────────────────────────────────────────────────────────────────────────
// Malformed assistant output
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_assistant_message_is_invalid() {
    let agent = make_agent(vec![MockLlm::empty()]);
    let user = make_user(vec![MockLlm::text("Hello?")]);
    let task = make_task(None);

    let sim = run(&task, &agent, &user, limits(300, 10)).await;

    assert_eq!(sim.termination_reason, TerminationReason::InvalidAgentMessage);
}

// ─────────────────────────────────────────────────────────────────────────────
// Seeded history decides who opens
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn agent_opens_when_seeded_history_ends_with_a_user_message() {
    let seeded = vec![Message::User(UserMessage {
        content: "I already asked for the menu.".into(),
        cost: Some(0.0),
        usage: None,
    })];
    let agent = make_agent(vec![MockLlm::text("Here is the menu.")]);
    let user = make_user(vec![MockLlm::text("###STOP###")]);
    let task = make_task(Some(seeded));

    let sim = run(&task, &agent, &user, limits(300, 10)).await;

    assert_eq!(sim.termination_reason, TerminationReason::UserStop);
    // Seeded user turn, agent reply, closing user turn.
    assert!(sim.messages[0].is_user());
    assert!(sim.messages[1].is_assistant());
}

#[tokio::test]
async fn user_opens_when_seeded_history_ends_with_an_agent_message() {
    let seeded = vec![Message::Assistant(AssistantMessage {
        content: Some("Anything else I can do?".into()),
        cost: Some(0.0),
        ..Default::default()
    })];
    let agent = make_agent(vec![]);
    let user = make_user(vec![MockLlm::text("No thanks. ###STOP###")]);
    let task = make_task(Some(seeded));

    let sim = run(&task, &agent, &user, limits(300, 10)).await;

    assert_eq!(sim.termination_reason, TerminationReason::UserStop);
    assert_eq!(sim.messages.len(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Cost accounting over the trajectory
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn costs_are_aggregated_per_side() {
    let mut reply = AssistantMessage::default();
    reply.content = Some("Done.".into());
    reply.cost = Some(0.25);
    let agent = make_agent(vec![Ok(reply)]);

    let user = make_user(vec![
        {
            let mut m = AssistantMessage::default();
            m.content = Some("Help me out.".into());
            m.cost = Some(0.5);
            Ok(m)
        },
        {
            let mut m = AssistantMessage::default();
            m.content = Some("###STOP###".into());
            m.cost = Some(0.5);
            Ok(m)
        },
    ]);
    let task = make_task(None);

    let sim = run(&task, &agent, &user, limits(300, 10)).await;

    assert_eq!(sim.agent_cost, Some(0.25));
    assert_eq!(sim.user_cost, Some(1.0));
}
