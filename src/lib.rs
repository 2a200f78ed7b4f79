pub mod error;
pub mod utils;
pub mod fuzzy;
pub mod message;
pub mod task;
pub mod db;
pub mod config;
pub mod retry;
pub mod toolkit;
pub mod domains;
pub mod env;
pub mod llm;
pub mod agent;
pub mod user;
pub mod orchestrator;
pub mod evaluator;
pub mod metrics;
pub mod results;
pub mod registry;

// Convenience re-exports at crate root
pub use agent::{Agent, AgentIncoming, AgentState, LlmAgent, LlmSoloAgent};
pub use config::{Language, ModelConfig, ModelsConfig, SimulationLimits};
pub use db::{Db, Location, Order, OrderStatus, OrderType, Weather};
pub use env::{build_environment, CompositeToolkit, Environment};
pub use error::VendError;
pub use evaluator::{evaluate_simulation, EvaluationOptions, EvaluationType, RewardInfo};
pub use llm::{ChatRequest, HttpLlm, LlmService, MockLlm};
pub use message::{
    AssistantMessage, Message, MultiToolMessage, SystemMessage, TokenUsage, ToolCall, ToolMessage,
    UserMessage,
};
pub use metrics::{compute_metrics, AgentMetrics};
pub use orchestrator::{
    run_and_evaluate, run_tasks, Orchestrator, RunOptions, SimulationRun, TerminationReason,
};
pub use registry::Registry;
pub use results::{Results, RunInfo};
pub use task::{Action, EvaluationCriteria, Task, UserScenario};
pub use toolkit::{ToolOutcome, ToolSpec, ToolType, Toolkit};
pub use user::{DummyUser, User, UserSimulator, STOP_TOKEN};
