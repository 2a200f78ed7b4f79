//! Typed tool catalog: schemas for the LLM, validation, and dispatch.
//!
//! Each domain toolkit owns a private database and exposes its tools
//! through [`Toolkit`]. Precondition failures are returned to the agent
//! as plain text; unknown tools and internal failures surface as error
//! outcomes that count against the simulation's error budget.

pub mod descriptions;
pub mod generic;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Language;
use crate::message::{JsonMap, ToolCall, ToolMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    Read,
    Write,
    Think,
    Generic,
}

/// One parameter of a tool, as exposed in the LLM-facing JSON schema.
/// Optional parameters keep their concrete JSON type and simply stay out
/// of the `required` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub json_type: &'static str,
    /// Element type for `array` parameters.
    pub items_type: Option<&'static str>,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, json_type: &'static str) -> Self {
        Self {
            name,
            json_type,
            items_type: None,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, json_type: &'static str) -> Self {
        Self {
            name,
            json_type,
            items_type: None,
            required: false,
        }
    }

    pub const fn required_list(name: &'static str, items_type: &'static str) -> Self {
        Self {
            name,
            json_type: "array",
            items_type: Some(items_type),
            required: true,
        }
    }

    pub const fn optional_list(name: &'static str, items_type: &'static str) -> Self {
        Self {
            name,
            json_type: "array",
            items_type: Some(items_type),
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub tool_type: ToolType,
    pub params: &'static [ParamSpec],
}

impl ToolSpec {
    /// The `{type: function, function: {...}}` view sent to tool-calling
    /// LLM APIs, with localized descriptions from the static bundle.
    pub fn openai_schema(&self, domain: &str, language: Language) -> Value {
        let bundle = descriptions::lookup(domain, self.name, language);

        let mut properties = JsonMap::new();
        let mut required = Vec::new();
        for param in self.params {
            let mut prop = JsonMap::new();
            prop.insert("type".into(), param.json_type.into());
            if let Some(items) = param.items_type {
                prop.insert("items".into(), json!({ "type": items }));
            }
            if let Some(bundle) = &bundle {
                if let Some((_, text)) = bundle.args.iter().find(|(name, _)| *name == param.name) {
                    prop.insert("description".into(), (*text).into());
                }
            }
            properties.insert(param.name.to_string(), Value::Object(prop));
            if param.required {
                required.push(param.name);
            }
        }

        let description = bundle
            .map(|b| b.render_description())
            .unwrap_or_else(|| self.name.to_string());

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            },
        })
    }
}

/// What happened when a tool was called. Outcomes with `is_error` set
/// count toward the simulation's error budget; the content is shown to
/// the agent either way.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

/// Internal result of one tool method.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolError {
    /// A validation/precondition failure: relayed to the agent as plain
    /// text, not counted as a system error.
    Precondition(String),
    /// An execution failure: relayed and counted.
    Failed(String),
}

pub type ToolResult = std::result::Result<String, ToolError>;

pub trait Toolkit: Send {
    fn domain(&self) -> &str;

    fn specs(&self) -> Vec<&'static ToolSpec>;

    /// Dispatch a call to the named tool. Implementations route to their
    /// tool methods; this wrapper never panics.
    fn call(&mut self, name: &str, arguments: &JsonMap) -> ToolOutcome {
        match self.dispatch(name, arguments) {
            Some(Ok(content)) => ToolOutcome {
                content,
                is_error: false,
            },
            Some(Err(ToolError::Precondition(message))) => ToolOutcome {
                content: message,
                is_error: false,
            },
            Some(Err(ToolError::Failed(message))) => {
                tracing::warn!(tool = name, error = %message, "tool execution failed");
                ToolOutcome {
                    content: message,
                    is_error: true,
                }
            }
            None => ToolOutcome {
                content: format!("Tool '{name}' not found"),
                is_error: true,
            },
        }
    }

    /// Route to a tool method. `None` means the tool is unknown.
    fn dispatch(&mut self, name: &str, arguments: &JsonMap) -> Option<ToolResult>;

    /// JSON snapshot of this toolkit's database.
    fn db_value(&self) -> Value;

    fn db_hash(&self) -> String;

    fn db_statistics(&self) -> JsonMap;

    fn has_tool(&self, name: &str) -> bool {
        self.specs().iter().any(|spec| spec.name == name)
    }

    fn tool_type(&self, name: &str) -> Option<ToolType> {
        self.specs()
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.tool_type)
    }

    fn openai_schemas(&self, language: Language) -> Vec<Value> {
        let domain = self.domain().to_string();
        self.specs()
            .iter()
            .map(|spec| spec.openai_schema(&domain, language))
            .collect()
    }

    /// Tool counts by classification.
    fn tool_statistics(&self) -> JsonMap {
        let specs = self.specs();
        let count = |t: ToolType| specs.iter().filter(|s| s.tool_type == t).count();
        let mut stats = JsonMap::new();
        stats.insert("num_tools".into(), specs.len().into());
        stats.insert("num_read_tools".into(), count(ToolType::Read).into());
        stats.insert("num_write_tools".into(), count(ToolType::Write).into());
        stats.insert("num_think_tools".into(), count(ToolType::Think).into());
        stats.insert("num_generic_tools".into(), count(ToolType::Generic).into());
        stats
    }
}

/// Execute one [`ToolCall`] against a toolkit and wrap the outcome as the
/// tool message fed back to the agent.
pub fn execute_call(toolkit: &mut dyn Toolkit, call: &ToolCall) -> ToolMessage {
    let outcome = toolkit.call(&call.name, &call.arguments);
    ToolMessage {
        id: call.id.clone(),
        name: call.name.clone(),
        content: outcome.content,
        error: outcome.is_error,
    }
}

// ── Argument extraction ─────────────────────────────────────────────
//
// Wrong or missing arguments produce the validation message the agent
// sees verbatim.

pub mod args {
    use super::{JsonMap, ToolError};
    use serde_json::Value;

    pub fn req_str(args: &JsonMap, name: &str) -> Result<String, ToolError> {
        match args.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ToolError::Precondition(format!(
                "Parameter '{name}' must be a string, got: {other}"
            ))),
            None => Err(ToolError::Precondition(format!(
                "Missing required parameter: {name}"
            ))),
        }
    }

    pub fn opt_str(args: &JsonMap, name: &str) -> Result<Option<String>, ToolError> {
        match args.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ToolError::Precondition(format!(
                "Parameter '{name}' must be a string, got: {other}"
            ))),
        }
    }

    pub fn req_f64(args: &JsonMap, name: &str) -> Result<f64, ToolError> {
        match args.get(name) {
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                ToolError::Precondition(format!("Parameter '{name}' must be a number"))
            }),
            Some(other) => Err(ToolError::Precondition(format!(
                "Parameter '{name}' must be a number, got: {other}"
            ))),
            None => Err(ToolError::Precondition(format!(
                "Missing required parameter: {name}"
            ))),
        }
    }

    pub fn req_i64(args: &JsonMap, name: &str) -> Result<i64, ToolError> {
        match args.get(name) {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                ToolError::Precondition(format!("Parameter '{name}' must be an integer"))
            }),
            Some(other) => Err(ToolError::Precondition(format!(
                "Parameter '{name}' must be an integer, got: {other}"
            ))),
            None => Err(ToolError::Precondition(format!(
                "Missing required parameter: {name}"
            ))),
        }
    }

    pub fn opt_i64(args: &JsonMap, name: &str, default: i64) -> Result<i64, ToolError> {
        match args.get(name) {
            None | Some(Value::Null) => Ok(default),
            _ => req_i64(args, name),
        }
    }

    pub fn req_str_list(args: &JsonMap, name: &str) -> Result<Vec<String>, ToolError> {
        let Some(value) = args.get(name) else {
            return Err(ToolError::Precondition(format!(
                "Missing required parameter: {name}"
            )));
        };
        let Value::Array(items) = value else {
            return Err(ToolError::Precondition(format!(
                "Parameter '{name}' must be a list"
            )));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ToolError::Precondition(format!(
                    "Parameter '{name}' must be a list of strings, got element: {other}"
                ))),
            })
            .collect()
    }

    pub fn opt_str_list(args: &JsonMap, name: &str) -> Result<Option<Vec<String>>, ToolError> {
        match args.get(name) {
            None | Some(Value::Null) => Ok(None),
            _ => req_str_list(args, name).map(Some),
        }
    }

    pub fn req_i64_list(args: &JsonMap, name: &str) -> Result<Vec<i64>, ToolError> {
        let Some(Value::Array(items)) = args.get(name) else {
            return Err(ToolError::Precondition(format!(
                "Parameter '{name}' must be a list of integers"
            )));
        };
        items
            .iter()
            .map(|item| {
                item.as_i64().ok_or_else(|| {
                    ToolError::Precondition(format!(
                        "Parameter '{name}' must be a list of integers, got element: {item}"
                    ))
                })
            })
            .collect()
    }
}

/// Precondition guard mirroring assertion-style validation: failures
/// become the message the agent reads.
#[macro_export]
macro_rules! require {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::toolkit::ToolError::Precondition(format!($($arg)*)));
        }
    };
}
