//! Named constructors for users, agents, domain environments and task
//! sets. Duplicate registration is an error; the default registry ships
//! the built-in implementations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::agent::{Agent, LlmAgent, LlmSoloAgent};
use crate::config::Language;
use crate::domains::task_file_name;
use crate::env::{build_environment, Environment};
use crate::error::{Result, VendError};
use crate::llm::LlmService;
use crate::task::{load_tasks, Task, UserScenario};
use crate::user::{DummyUser, User, UserSimulator};

/// Everything an agent constructor needs.
pub struct AgentContext {
    pub llm: Arc<dyn LlmService>,
    pub model: String,
    pub tool_schemas: Vec<Value>,
    pub domain_policy: String,
    pub time: String,
    pub language: Language,
}

/// Everything a user constructor needs.
pub struct UserContext {
    pub llm: Arc<dyn LlmService>,
    pub model: String,
    pub scenario: UserScenario,
    pub language: Language,
}

pub type AgentBuilder = Box<dyn Fn(AgentContext) -> Result<Box<dyn Agent>> + Send + Sync>;
pub type UserBuilder = Box<dyn Fn(UserContext) -> Box<dyn User> + Send + Sync>;
pub type EnvBuilder = Box<dyn Fn(&Value, Language) -> Result<Environment> + Send + Sync>;
pub type TaskLoader = Box<dyn Fn(&Path, Language) -> Result<Vec<Task>> + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct RegistryInfo {
    pub domains: Vec<String>,
    pub agents: Vec<String>,
    pub users: Vec<String>,
    pub task_sets: Vec<String>,
}

pub struct Registry {
    users: HashMap<String, UserBuilder>,
    agents: HashMap<String, AgentBuilder>,
    domains: HashMap<String, EnvBuilder>,
    tasks: HashMap<String, TaskLoader>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            agents: HashMap::new(),
            domains: HashMap::new(),
            tasks: HashMap::new(),
        }
    }

    /// The built-in users, agents, domains and task sets.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry
            .register_user("user_simulator", Box::new(|ctx: UserContext| {
                Box::new(UserSimulator::new(ctx.llm, ctx.model, ctx.scenario, ctx.language))
                    as Box<dyn User>
            }))
            .and_then(|r| {
                r.register_user("dummy_user", Box::new(|_ctx: UserContext| {
                    Box::new(DummyUser::new("")) as Box<dyn User>
                }))
            })
            .and_then(|r| {
                r.register_agent("llm_agent", Box::new(|ctx: AgentContext| {
                    Ok(Box::new(LlmAgent::new(
                        ctx.llm,
                        ctx.model,
                        ctx.tool_schemas,
                        ctx.domain_policy,
                        &ctx.time,
                        ctx.language,
                    )?) as Box<dyn Agent>)
                }))
            })
            .and_then(|r| {
                r.register_agent("llm_solo_agent", Box::new(|ctx: AgentContext| {
                    Ok(Box::new(LlmSoloAgent::new(
                        ctx.llm,
                        ctx.model,
                        ctx.tool_schemas,
                        ctx.domain_policy,
                        &ctx.time,
                        ctx.language,
                    )?) as Box<dyn Agent>)
                }))
            })
            .expect("default users/agents register cleanly");

        for domain in ["delivery", "instore", "ota", "cross_domain"] {
            registry
                .register_domain(
                    domain,
                    Box::new(move |environment, language| {
                        build_environment(domain, environment, language)
                    }),
                )
                .expect("default domains register cleanly");
        }

        for domain in ["delivery", "instore", "ota"] {
            registry
                .register_tasks(
                    domain,
                    Box::new(move |data_dir, language| {
                        load_tasks(domain_task_path(data_dir, domain, language))
                    }),
                )
                .expect("default task sets register cleanly");
        }
        // The cross-domain set is the union of the three domain files.
        registry
            .register_tasks(
                "cross_domain",
                Box::new(|data_dir, language| {
                    let mut tasks = Vec::new();
                    for domain in ["delivery", "instore", "ota"] {
                        let path = domain_task_path(data_dir, domain, language);
                        if path.exists() {
                            tasks.extend(load_tasks(path)?);
                        }
                    }
                    Ok(tasks)
                }),
            )
            .expect("cross-domain task set registers cleanly");

        registry
    }

    pub fn register_user(&mut self, name: &str, builder: UserBuilder) -> Result<&mut Self> {
        if self.users.contains_key(name) {
            return Err(VendError::Config(format!("User {name} already registered")));
        }
        self.users.insert(name.to_string(), builder);
        Ok(self)
    }

    pub fn register_agent(&mut self, name: &str, builder: AgentBuilder) -> Result<&mut Self> {
        if self.agents.contains_key(name) {
            return Err(VendError::Config(format!("Agent {name} already registered")));
        }
        self.agents.insert(name.to_string(), builder);
        Ok(self)
    }

    pub fn register_domain(&mut self, name: &str, builder: EnvBuilder) -> Result<&mut Self> {
        if self.domains.contains_key(name) {
            return Err(VendError::Config(format!("Domain {name} already registered")));
        }
        self.domains.insert(name.to_string(), builder);
        Ok(self)
    }

    pub fn register_tasks(&mut self, name: &str, loader: TaskLoader) -> Result<&mut Self> {
        if self.tasks.contains_key(name) {
            return Err(VendError::Config(format!("Tasks {name} already registered")));
        }
        self.tasks.insert(name.to_string(), loader);
        Ok(self)
    }

    pub fn user_builder(&self, name: &str) -> Result<&UserBuilder> {
        self.users
            .get(name)
            .ok_or_else(|| VendError::Config(format!("User {name} not found in registry")))
    }

    pub fn agent_builder(&self, name: &str) -> Result<&AgentBuilder> {
        self.agents
            .get(name)
            .ok_or_else(|| VendError::Config(format!("Agent {name} not found in registry")))
    }

    pub fn env_builder(&self, name: &str) -> Result<&EnvBuilder> {
        self.domains
            .get(name)
            .ok_or_else(|| VendError::UnknownDomain(name.to_string()))
    }

    pub fn tasks_loader(&self, name: &str) -> Result<&TaskLoader> {
        self.tasks
            .get(name)
            .ok_or_else(|| VendError::Config(format!("Task Set {name} not found in registry")))
    }

    pub fn info(&self) -> RegistryInfo {
        let mut sorted = |keys: Vec<String>| -> Vec<String> {
            let mut keys = keys;
            keys.sort();
            keys
        };
        RegistryInfo {
            domains: sorted(self.domains.keys().cloned().collect()),
            agents: sorted(self.agents.keys().cloned().collect()),
            users: sorted(self.users.keys().cloned().collect()),
            task_sets: sorted(self.tasks.keys().cloned().collect()),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn domain_task_path(data_dir: &Path, domain: &str, language: Language) -> PathBuf {
    data_dir.join(domain).join(task_file_name(language))
}
