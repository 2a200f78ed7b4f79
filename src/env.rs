//! The agent's interface to the simulated world: a domain toolkit bound
//! to a private database, plus the domain policy for the system prompt.

use serde_json::Value;

use crate::config::Language;
use crate::error::{Result, VendError};
use crate::message::{JsonMap, MultiToolMessage, ToolCall, ToolMessage};
use crate::task::Task;
use crate::toolkit::{execute_call, ToolOutcome, ToolResult, ToolSpec, Toolkit};
use crate::utils::get_hash;

pub struct Environment {
    pub domain_name: String,
    /// Agent system-prompt template with a `{time}` placeholder.
    pub policy: String,
    pub language: Language,
    toolkit: Box<dyn Toolkit>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("domain_name", &self.domain_name)
            .field("policy", &self.policy)
            .field("language", &self.language)
            .finish()
    }
}

impl Environment {
    pub fn new(
        domain_name: impl Into<String>,
        policy: impl Into<String>,
        language: Language,
        toolkit: Box<dyn Toolkit>,
    ) -> Self {
        Self {
            domain_name: domain_name.into(),
            policy: policy.into(),
            language,
            toolkit,
        }
    }

    /// Build the environment for a task's domain from its environment
    /// blob.
    pub fn for_task(task: &Task, language: Language) -> Result<Self> {
        build_environment(&task.domain, &task.environment, language)
    }

    pub fn use_tool(&mut self, call: &ToolCall) -> ToolMessage {
        execute_call(self.toolkit.as_mut(), call)
    }

    /// Run every call of one assistant turn, keeping call order.
    pub fn use_tools(&mut self, calls: &[ToolCall]) -> MultiToolMessage {
        MultiToolMessage {
            tool_messages: calls.iter().map(|call| self.use_tool(call)).collect(),
        }
    }

    pub fn tool_schemas(&self) -> Vec<Value> {
        self.toolkit.openai_schemas(self.language)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.toolkit.has_tool(name)
    }

    pub fn db_value(&self) -> Value {
        self.toolkit.db_value()
    }

    pub fn db_hash(&self) -> String {
        self.toolkit.db_hash()
    }

    pub fn statistics(&self) -> JsonMap {
        let mut stats = self.toolkit.db_statistics();
        stats.append(&mut self.toolkit.tool_statistics());
        stats
    }
}

/// Construct a domain environment by name. The cross-domain tag builds
/// one toolkit per member domain behind a [`CompositeToolkit`].
pub fn build_environment(domain: &str, environment: &Value, language: Language) -> Result<Environment> {
    use crate::domains::{delivery, instore, ota};

    let toolkit: Box<dyn Toolkit> = match domain {
        "delivery" => Box::new(delivery::DeliveryToolkit::new(
            delivery::DeliveryDb::from_env(environment)?,
            language,
        )),
        "instore" => Box::new(instore::InstoreToolkit::new(
            instore::InstoreDb::from_env(environment)?,
            language,
        )),
        "ota" => Box::new(ota::OtaToolkit::new(
            ota::OtaDb::from_env(environment)?,
            language,
        )),
        "cross_domain" => Box::new(CompositeToolkit::new(vec![
            Box::new(delivery::DeliveryToolkit::new(
                delivery::DeliveryDb::from_env(environment)?,
                language,
            )),
            Box::new(instore::InstoreToolkit::new(
                instore::InstoreDb::from_env(environment)?,
                language,
            )),
            Box::new(ota::OtaToolkit::new(
                ota::OtaDb::from_env(environment)?,
                language,
            )),
        ])),
        other => return Err(VendError::UnknownDomain(other.to_string())),
    };
    Ok(Environment::new(
        domain,
        default_agent_policy(language),
        language,
        toolkit,
    ))
}

/// Holds one toolkit per domain tag; each call is dispatched to the
/// member that owns the tool.
pub struct CompositeToolkit {
    members: Vec<Box<dyn Toolkit>>,
}

impl CompositeToolkit {
    pub fn new(members: Vec<Box<dyn Toolkit>>) -> Self {
        Self { members }
    }
}

impl Toolkit for CompositeToolkit {
    fn domain(&self) -> &str {
        "cross_domain"
    }

    fn specs(&self) -> Vec<&'static ToolSpec> {
        let mut specs = Vec::new();
        for member in &self.members {
            for spec in member.specs() {
                if !specs.iter().any(|existing: &&ToolSpec| existing.name == spec.name) {
                    specs.push(spec);
                }
            }
        }
        specs
    }

    fn call(&mut self, name: &str, arguments: &JsonMap) -> ToolOutcome {
        for member in &mut self.members {
            if member.has_tool(name) {
                return member.call(name, arguments);
            }
        }
        ToolOutcome {
            content: format!("Tool '{name}' not found"),
            is_error: true,
        }
    }

    fn dispatch(&mut self, name: &str, arguments: &JsonMap) -> Option<ToolResult> {
        for member in &mut self.members {
            if member.has_tool(name) {
                return member.dispatch(name, arguments);
            }
        }
        None
    }

    fn db_value(&self) -> Value {
        let mut merged = JsonMap::new();
        for member in &self.members {
            merged.insert(member.domain().to_string(), member.db_value());
        }
        Value::Object(merged)
    }

    /// Member hashes are sorted before combining so the merged hash does
    /// not depend on registration order.
    fn db_hash(&self) -> String {
        let mut hashes: Vec<String> = self.members.iter().map(|m| m.db_hash()).collect();
        hashes.sort();
        get_hash(&hashes.join("|"))
    }

    fn db_statistics(&self) -> JsonMap {
        let mut merged = JsonMap::new();
        for member in &self.members {
            merged.append(&mut member.db_statistics());
        }
        merged
    }
}

/// Built-in agent policy used when the caller does not supply one. Real
/// deployments pass their own authored policy text through
/// [`Environment::new`].
pub fn default_agent_policy(language: Language) -> String {
    match language {
        Language::English => "\
You are a customer-service agent for a local-life platform covering food \
delivery, in-store dining and travel booking. The current time is {time}.\n\
Help the user accomplish their goal with the provided tools. Confirm the \
key details of an order with the user before creating or paying for it, \
never invent ids, and report tool failures honestly."
            .to_string(),
        Language::Chinese => "\
你是本地生活平台的客服助手，覆盖外卖、到店和旅行预订场景。当前时间为{time}。\n\
请使用提供的工具帮助用户完成目标。在创建或支付订单前与用户确认关键信息，\
不得编造任何id，工具调用失败时如实告知用户。"
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delivery_env() -> Environment {
        let blob = json!({
            "time": "2025-08-01 10:00:00",
            "user_id": "user_001",
            "stores": {},
        });
        build_environment("delivery", &blob, Language::English).unwrap()
    }

    #[test]
    fn unknown_domain_is_rejected() {
        let err = build_environment("cruise", &Value::Null, Language::English).unwrap_err();
        assert!(matches!(err, VendError::UnknownDomain(_)));
    }

    #[test]
    fn unknown_tool_reports_literal_error() {
        let mut env = delivery_env();
        let call = ToolCall {
            id: Some("call_1".into()),
            name: "warp_drive".into(),
            arguments: JsonMap::new(),
        };
        let response = env.use_tool(&call);
        assert!(response.error);
        assert_eq!(response.content, "Tool 'warp_drive' not found");
    }

    #[test]
    fn composite_routes_to_owning_member() {
        let blob = json!({
            "time": "2025-08-01 10:00:00",
            "user_id": "user_001",
        });
        let mut env = build_environment("cross_domain", &blob, Language::English).unwrap();
        // A delivery-only tool resolves through the composite.
        assert!(env.has_tool("create_delivery_order"));
        assert!(env.has_tool("create_hotel_order"));
        let call = ToolCall {
            id: None,
            name: "get_delivery_order_status".into(),
            arguments: json!({"order_id": "OT_missing"}).as_object().cloned().unwrap(),
        };
        let response = env.use_tool(&call);
        assert!(!response.error);
        assert!(response.content.contains("not found"));
    }

    #[test]
    fn composite_hash_is_order_insensitive() {
        let blob = json!({"time": "2025-08-01 10:00:00", "user_id": "u"});
        let language = Language::English;
        use crate::domains::{delivery, instore};
        let a = CompositeToolkit::new(vec![
            Box::new(delivery::DeliveryToolkit::new(
                delivery::DeliveryDb::from_env(&blob).unwrap(),
                language,
            )),
            Box::new(instore::InstoreToolkit::new(
                instore::InstoreDb::from_env(&blob).unwrap(),
                language,
            )),
        ]);
        let b = CompositeToolkit::new(vec![
            Box::new(instore::InstoreToolkit::new(
                instore::InstoreDb::from_env(&blob).unwrap(),
                language,
            )),
            Box::new(delivery::DeliveryToolkit::new(
                delivery::DeliveryDb::from_env(&blob).unwrap(),
                language,
            )),
        ]);
        assert_eq!(a.db_hash(), b.db_hash());
    }
}
