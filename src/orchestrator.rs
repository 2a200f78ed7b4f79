//! The bounded conversation loop and the tasks × trials fan-out.
//!
//! One simulation alternates agent turns (which may chain through tool
//! batches), user turns, and termination checks; many simulations run
//! concurrently under a semaphore bound, each with a fully private
//! environment.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::agent::{Agent, AgentIncoming, LlmAgent};
use crate::config::{Language, SimulationLimits, DEFAULT_MAX_CONCURRENCY, DEFAULT_NUM_TRIALS, DEFAULT_SEED};
use crate::env::Environment;
use crate::error::{Result, VendError};
use crate::evaluator::RewardInfo;
use crate::llm::LlmService;
use crate::message::{self, Message};
use crate::task::Task;
use crate::user::{User, UserSimulator};
use crate::utils::{get_now, RUN_TIME_FORMAT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    UserStop,
    AgentStop,
    MaxSteps,
    TooManyErrors,
    InvalidAgentMessage,
    MaxDuration,
}

impl TerminationReason {
    /// Premature endings score 0.0 without consulting any judge.
    pub fn is_premature(self) -> bool {
        matches!(
            self,
            TerminationReason::MaxSteps
                | TerminationReason::TooManyErrors
                | TerminationReason::InvalidAgentMessage
                | TerminationReason::MaxDuration
        )
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TerminationReason::UserStop => "user_stop",
            TerminationReason::AgentStop => "agent_stop",
            TerminationReason::MaxSteps => "max_steps",
            TerminationReason::TooManyErrors => "too_many_errors",
            TerminationReason::InvalidAgentMessage => "invalid_agent_message",
            TerminationReason::MaxDuration => "max_duration",
        };
        write!(f, "{text}")
    }
}

/// One finished simulation: the trajectory, the final world state, and
/// the accounting around them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub id: String,
    pub task_id: String,
    pub trial: usize,
    pub seed: u64,
    pub start_time: String,
    pub end_time: String,
    /// Wall-clock seconds.
    pub duration: f64,
    pub termination_reason: TerminationReason,
    pub messages: Vec<Message>,
    /// Final DB snapshot.
    pub states: Value,
    pub db_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_cost: Option<f64>,
    #[serde(default)]
    pub agent_usage: crate::message::TokenUsage,
    #[serde(default)]
    pub user_usage: crate::message::TokenUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_info: Option<RewardInfo>,
}

enum Turn {
    Agent,
    User,
}

pub struct Orchestrator {
    pub limits: SimulationLimits,
}

impl Orchestrator {
    pub fn new(limits: SimulationLimits) -> Self {
        Self { limits }
    }

    /// Drive one simulation to a terminal state.
    ///
    /// The task's seeded history decides who opens: the user on empty
    /// history, the agent when the last seeded message is from the user.
    pub async fn run_simulation(
        &self,
        task: &Task,
        agent: &dyn Agent,
        user: &dyn User,
        env: &mut Environment,
        trial: usize,
        seed: u64,
    ) -> Result<SimulationRun> {
        let started = Instant::now();
        let start_time = get_now(RUN_TIME_FORMAT);

        let seeded = task.message_history.clone();
        let mut trajectory: Vec<Message> = seeded.clone().unwrap_or_default();
        let mut agent_state = agent.init_state(seeded.clone())?;
        let mut user_state = user.init_state(seeded);

        let mut turn = match trajectory.last() {
            None => Turn::User,
            Some(last) if last.is_user() => Turn::Agent,
            Some(_) => Turn::User,
        };

        let mut steps = 0usize;
        let mut errors = 0usize;
        let mut pending_for_agent: Option<AgentIncoming> = None;
        let mut pending_for_user: Option<message::AssistantMessage> = None;

        let reason = loop {
            if steps >= self.limits.max_steps {
                break TerminationReason::MaxSteps;
            }
            if let Some(budget) = self.limits.max_duration {
                if started.elapsed() >= budget {
                    break TerminationReason::MaxDuration;
                }
            }

            match turn {
                Turn::User => {
                    let user_message = user
                        .generate_next(pending_for_user.take().as_ref(), &mut user_state)
                        .await?;
                    trajectory.push(Message::User(user_message.clone()));
                    steps += 1;
                    if crate::user::UserSimulator::is_stop(&user_message) {
                        break TerminationReason::UserStop;
                    }
                    pending_for_agent = Some(AgentIncoming::User(user_message));
                    turn = Turn::Agent;
                }
                Turn::Agent => {
                    let assistant_message = match agent
                        .generate_next(pending_for_agent.take(), &mut agent_state)
                        .await
                    {
                        Ok(message) => message,
                        Err(VendError::InvalidAgentMessage(detail)) => {
                            tracing::warn!(task_id = %task.id, %detail, "invalid agent message");
                            break TerminationReason::InvalidAgentMessage;
                        }
                        Err(other) => return Err(other),
                    };
                    trajectory.push(Message::Assistant(assistant_message.clone()));
                    steps += 1;

                    if assistant_message.is_tool_call() {
                        let calls = assistant_message.tool_calls.clone().unwrap_or_default();
                        let batch = env.use_tools(&calls);
                        for tool_message in &batch.tool_messages {
                            if tool_message.error {
                                errors += 1;
                            }
                            trajectory.push(Message::Tool(tool_message.clone()));
                        }
                        if errors > 0 && errors >= self.limits.max_errors {
                            break TerminationReason::TooManyErrors;
                        }
                        // The agent keeps the turn until it answers in
                        // plain text.
                        pending_for_agent = Some(AgentIncoming::MultiTool(batch));
                        turn = Turn::Agent;
                    } else if assistant_message.has_content() {
                        if assistant_message
                            .content
                            .as_deref()
                            .is_some_and(|content| content.contains(crate::user::STOP_TOKEN))
                        {
                            break TerminationReason::AgentStop;
                        }
                        pending_for_user = Some(assistant_message);
                        turn = Turn::User;
                    } else {
                        break TerminationReason::InvalidAgentMessage;
                    }
                }
            }
        };

        let (agent_cost, user_cost) = match message::get_cost(&trajectory) {
            Some((agent_cost, user_cost)) => (Some(agent_cost), Some(user_cost)),
            None => (None, None),
        };
        let (agent_usage, user_usage) = message::get_usage(&trajectory);

        Ok(SimulationRun {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task.id.clone(),
            trial,
            seed,
            start_time,
            end_time: get_now(RUN_TIME_FORMAT),
            duration: started.elapsed().as_secs_f64(),
            termination_reason: reason,
            messages: trajectory,
            states: env.db_value(),
            db_hash: env.db_hash(),
            agent_cost,
            user_cost,
            agent_usage,
            user_usage,
            reward_info: None,
        })
    }
}

/// Options for a whole run over a task set.
#[derive(Clone)]
pub struct RunOptions {
    pub language: Language,
    pub agent_model: String,
    pub user_model: String,
    pub num_trials: usize,
    pub base_seed: u64,
    pub max_concurrency: usize,
    pub limits: SimulationLimits,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            language: Language::default(),
            agent_model: String::new(),
            user_model: String::new(),
            num_trials: DEFAULT_NUM_TRIALS,
            base_seed: DEFAULT_SEED,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            limits: SimulationLimits::default(),
        }
    }
}

/// Run every (task, trial) pair with a bounded fan-out. Each simulation
/// owns a fresh environment, agent state and user state; the trial's
/// seed is `base_seed + trial_index`.
pub async fn run_tasks(
    tasks: Vec<Task>,
    llm: Arc<dyn LlmService>,
    options: RunOptions,
) -> Result<Vec<SimulationRun>> {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let orchestrator = Arc::new(Orchestrator::new(options.limits));
    let mut handles = Vec::new();

    for task in tasks {
        for trial in 0..options.num_trials {
            let semaphore = Arc::clone(&semaphore);
            let orchestrator = Arc::clone(&orchestrator);
            let llm = Arc::clone(&llm);
            let options = options.clone();
            let task = task.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| VendError::Config(format!("semaphore closed: {e}")))?;

                let seed = options.base_seed + trial as u64;
                let mut env = Environment::for_task(&task, options.language)?;
                let time = task
                    .environment
                    .get("time")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        VendError::InvalidTask(format!(
                            "task {} has no simulated time in its environment",
                            task.id
                        ))
                    })?;

                let mut agent = LlmAgent::new(
                    llm.clone(),
                    &options.agent_model,
                    env.tool_schemas(),
                    env.policy.clone(),
                    time,
                    options.language,
                )?;
                agent.set_seed(seed);
                let mut user = UserSimulator::new(
                    llm,
                    &options.user_model,
                    task.user_scenario.clone(),
                    options.language,
                );
                user.set_seed(seed);

                orchestrator
                    .run_simulation(&task, &agent, &user, &mut env, trial, seed)
                    .await
            }));
        }
    }

    let mut simulations = Vec::with_capacity(handles.len());
    for handle in handles {
        let run = handle
            .await
            .map_err(|e| VendError::Config(format!("simulation task panicked: {e}")))??;
        simulations.push(run);
    }
    Ok(simulations)
}

/// Run a task set and grade every simulation. An aborted evaluation
/// leaves that simulation's reward empty instead of failing the run;
/// the metrics layer treats it as missing.
pub async fn run_and_evaluate(
    tasks: Vec<Task>,
    llm: Arc<dyn LlmService>,
    options: RunOptions,
    evaluation: crate::evaluator::EvaluationOptions,
) -> Result<Vec<SimulationRun>> {
    let by_id: std::collections::HashMap<String, Task> = tasks
        .iter()
        .map(|task| (task.id.clone(), task.clone()))
        .collect();
    let mut simulations = run_tasks(tasks, Arc::clone(&llm), options).await?;

    for simulation in &mut simulations {
        let task = by_id.get(&simulation.task_id).ok_or_else(|| {
            VendError::InvalidTask(format!("simulation references unknown task {}", simulation.task_id))
        })?;
        let mut evaluation = evaluation.clone();
        if evaluation.seed.is_none() {
            evaluation.seed = Some(simulation.seed);
        }
        match crate::evaluator::evaluate_simulation(Arc::clone(&llm), simulation, task, &evaluation)
            .await
        {
            Ok(reward_info) => simulation.reward_info = Some(reward_info),
            Err(VendError::EvaluationAborted { panel_size, retries }) => {
                tracing::error!(
                    simulation = %simulation.id,
                    panel_size,
                    retries,
                    "evaluation aborted, persisting without a reward"
                );
                simulation.reward_info = None;
            }
            Err(other) => return Err(other),
        }
    }
    Ok(simulations)
}
