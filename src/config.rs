//! Model configuration (YAML with env substitution) and run defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, VendError};
use crate::message::{JsonMap, TokenUsage};

// ── Simulation defaults ─────────────────────────────────────────────
pub const DEFAULT_MAX_STEPS: usize = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_ERRORS: usize = 10;
pub const DEFAULT_SEED: u64 = 300;
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;
pub const DEFAULT_NUM_TRIALS: usize = 1;

/// Env var pointing at the model configuration file. Falls back to
/// `models.yaml` in the working directory.
pub const MODEL_CONFIG_PATH_ENV: &str = "VENDSIM_MODEL_CONFIG_PATH";

/// Prompt/tool-description language. Plumbed explicitly to every site that
/// formats text for an LLM; there is no process-wide language state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Chinese,
}

impl Default for Language {
    fn default() -> Self {
        Self::Chinese
    }
}

impl std::str::FromStr for Language {
    type Err = VendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "zh" | "chinese" => Ok(Self::Chinese),
            other => Err(VendError::Config(format!("unknown language: {other}"))),
        }
    }
}

/// Dollars per million tokens for one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    #[serde(default)]
    pub prompt_price: f64,
    #[serde(default)]
    pub completion_price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Request timeout in seconds. Default 600.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_1m_token_dollar: Option<ModelPricing>,
    /// Model-specific request fields passed through verbatim
    /// (e.g. `reasoning_effort`, provider routing hints).
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ModelConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(600))
    }

    /// Dollar cost of one response. Zero when either price is missing.
    pub fn response_cost(&self, usage: TokenUsage) -> f64 {
        let Some(pricing) = self.cost_1m_token_dollar else {
            return 0.0;
        };
        if pricing.prompt_price == 0.0 || pricing.completion_price == 0.0 {
            return 0.0;
        }
        (pricing.prompt_price * f64::from(usage.prompt_tokens)
            + pricing.completion_price * f64::from(usage.completion_tokens))
            / 1_000_000.0
    }
}

/// The parsed model configuration file: a `default` block deep-merged
/// under every entry of the `models` list.
#[derive(Debug, Clone, Default)]
pub struct ModelsConfig {
    models: HashMap<String, ModelConfig>,
}

impl ModelsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VendError::Config(format!(
                "model configuration file {} could not be read: {e}",
                path.display()
            ))
        })?;
        let yaml: serde_yaml::Value = serde_yaml::from_str(&raw)?;
        let mut root = serde_json::to_value(yaml)?;
        substitute_env_vars(&mut root);

        let default_block = root
            .get("default")
            .cloned()
            .unwrap_or_else(|| Value::Object(JsonMap::new()));

        let mut models = HashMap::new();
        models.insert(
            "default".to_string(),
            serde_json::from_value(default_block.clone())?,
        );
        if let Some(entries) = root.get("models").and_then(Value::as_array) {
            for entry in entries {
                let name = entry
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| VendError::Config("model entry without a name".into()))?
                    .to_string();
                let merged = deep_merge(&default_block, entry);
                models.insert(name, serde_json::from_value(merged)?);
            }
        }
        tracing::info!(models = ?models.keys().collect::<Vec<_>>(), "loaded model configuration");
        Ok(Self { models })
    }

    /// Load from `$VENDSIM_MODEL_CONFIG_PATH`, or `models.yaml` beside the
    /// process working directory.
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        std::env::var(MODEL_CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("models.yaml"))
    }

    pub fn get(&self, name: &str) -> Result<&ModelConfig> {
        self.models
            .get(name)
            .ok_or_else(|| VendError::UnknownModel(name.to_string()))
    }

    pub fn insert(&mut self, name: impl Into<String>, config: ModelConfig) {
        self.models.insert(name.into(), config);
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }
}

/// Caps applied to one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationLimits {
    pub max_steps: usize,
    pub max_errors: usize,
    /// Wall-clock budget for the whole simulation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<Duration>,
}

impl Default for SimulationLimits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_errors: DEFAULT_MAX_ERRORS,
            max_duration: None,
        }
    }
}

fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let entry = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

/// Replace `${VAR}` / `${VAR:default}` occurrences in every string leaf.
fn substitute_env_vars(value: &mut Value) {
    match value {
        Value::String(s) => *s = substitute_in_str(s),
        Value::Array(items) => items.iter_mut().for_each(substitute_env_vars),
        Value::Object(map) => map.values_mut().for_each(substitute_env_vars),
        _ => {}
    }
}

fn substitute_in_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let inner = &after[..end];
        let (var, default) = match inner.split_once(':') {
            Some((var, default)) => (var, default),
            None => (inner, ""),
        };
        out.push_str(&std::env::var(var).unwrap_or_else(|_| default.to_string()));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
default:
  base_url: "https://gateway.internal/v1/chat/completions"
  temperature: 0.0
  timeout: 600
  headers:
    Content-Type: application/json
models:
  - name: gpt-4.1
    api_key: "${TEST_ONLY_MISSING_KEY:sk-fallback}"
    cost_1m_token_dollar:
      prompt_price: 2.0
      completion_price: 8.0
  - name: judge-sonnet
    base_url: "https://judges.internal/v1/chat/completions"
    temperature: 0.2
"#;

    fn load_sample() -> ModelsConfig {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        ModelsConfig::load(file.path()).unwrap()
    }

    #[test]
    fn default_block_is_deep_merged() {
        let config = load_sample();
        let gpt = config.get("gpt-4.1").unwrap();
        assert_eq!(gpt.base_url, "https://gateway.internal/v1/chat/completions");
        assert_eq!(gpt.temperature, Some(0.0));
        assert_eq!(gpt.headers.get("Content-Type").unwrap(), "application/json");

        let judge = config.get("judge-sonnet").unwrap();
        assert_eq!(judge.base_url, "https://judges.internal/v1/chat/completions");
        assert_eq!(judge.temperature, Some(0.2));
    }

    #[test]
    fn env_substitution_uses_default_when_var_missing() {
        let config = load_sample();
        assert_eq!(
            config.get("gpt-4.1").unwrap().api_key.as_deref(),
            Some("sk-fallback")
        );
    }

    #[test]
    fn cost_is_zero_without_pricing() {
        let config = load_sample();
        let usage = TokenUsage::new(1_000_000, 1_000_000);
        assert_eq!(config.get("judge-sonnet").unwrap().response_cost(usage), 0.0);
        assert_eq!(config.get("gpt-4.1").unwrap().response_cost(usage), 10.0);
    }

    #[test]
    fn unknown_model_is_an_error() {
        let config = load_sample();
        assert!(matches!(
            config.get("nope"),
            Err(VendError::UnknownModel(_))
        ));
    }
}
