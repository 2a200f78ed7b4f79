//! OpenAI-compatible chat-completions client over raw reqwest.
//!
//! Raw JSON bodies (rather than a typed SDK) because the gateway
//! protocol needs per-model headers, passthrough request fields, and
//! provider-specific cache-control blocks.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{ModelConfig, ModelsConfig};
use crate::error::{Result, VendError};
use crate::llm::{ChatRequest, LlmService};
use crate::message::{AssistantMessage, JsonMap, Message, TokenUsage, ToolCall};

const TRANSPORT_RETRIES: u32 = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpLlm {
    client: reqwest::Client,
    models: ModelsConfig,
}

impl HttpLlm {
    pub fn new(models: ModelsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| VendError::Llm(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, models })
    }

    /// Serialize the conversation into the wire shape, carrying through
    /// any interleaved reasoning content.
    fn format_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|message| match message {
                Message::System(m) => json!({ "role": "system", "content": m.content }),
                Message::User(m) => json!({ "role": "user", "content": m.content }),
                Message::Assistant(m) => {
                    let tool_calls: Option<Vec<Value>> = m.tool_calls.as_ref().map(|calls| {
                        calls
                            .iter()
                            .map(|call| {
                                json!({
                                    "id": call.id,
                                    "name": call.name,
                                    "function": {
                                        "name": call.name,
                                        "arguments": serde_json::to_string(&call.arguments)
                                            .unwrap_or_else(|_| "{}".to_string()),
                                    },
                                    "type": "function",
                                })
                            })
                            .collect()
                    });
                    let mut formatted = json!({
                        "role": "assistant",
                        "content": m.content,
                        "tool_calls": tool_calls,
                    });
                    if let Some(reasoning) = m
                        .raw_data
                        .as_ref()
                        .and_then(|raw| raw.get("message"))
                        .and_then(|msg| msg.get("reasoning_content"))
                    {
                        if !reasoning.is_null() {
                            formatted["reasoning_content"] = reasoning.clone();
                        }
                    }
                    formatted
                }
                Message::Tool(m) => json!({
                    "role": "tool",
                    "content": m.content,
                    "tool_call_id": m.id,
                    "name": m.name,
                }),
            })
            .collect()
    }

    /// Model families with server-side prompt caching get an ephemeral
    /// cache marker on each text block of the last up-to-3 messages.
    fn apply_cache_markers(model_name: &str, formatted: &mut [Value]) {
        let lowered = model_name.to_lowercase();
        if !lowered.contains("claude") && !lowered.contains("minimax") {
            return;
        }
        let len = formatted.len();
        let start = len.saturating_sub(3);
        for message in &mut formatted[start..] {
            let Some(content) = message.get("content") else {
                continue;
            };
            if let Some(text) = content.as_str() {
                message["content"] = json!([{
                    "type": "text",
                    "text": text,
                    "cache_control": { "type": "ephemeral" },
                }]);
            }
        }
    }

    fn build_body(config: &ModelConfig, request: &ChatRequest, messages: Vec<Value>) -> Value {
        let mut body = JsonMap::new();
        body.insert("model".into(), config.name.clone().into());
        body.insert("messages".into(), Value::Array(messages));
        body.insert("stream".into(), false.into());
        if let Some(temperature) = config.temperature {
            body.insert("temperature".into(), temperature.into());
        }
        if let Some(max_tokens) = config.max_tokens {
            body.insert("max_tokens".into(), max_tokens.into());
        }
        if let Some(seed) = request.seed.or(config.seed) {
            body.insert("seed".into(), seed.into());
        }
        if let Some(tools) = &request.tools {
            body.insert("tools".into(), Value::Array(tools.clone()));
            body.insert(
                "tool_choice".into(),
                request.tool_choice.clone().unwrap_or_else(|| "auto".into()).into(),
            );
        }
        for (key, value) in &config.extra {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }

    /// POST with bounded retries: HTTP 500 and transport errors back off
    /// exponentially from 1s; other statuses are returned as-is.
    async fn post_with_retries(&self, config: &ModelConfig, body: &Value) -> Result<Value> {
        let mut delay = Duration::from_secs(1);
        let mut last_err = String::new();
        for attempt in 0..=TRANSPORT_RETRIES {
            let mut request = self
                .client
                .post(&config.base_url)
                .timeout(config.request_timeout())
                .json(body);
            for (name, value) in &config.headers {
                request = request.header(name, value);
            }
            if let Some(api_key) = &config.api_key {
                request = request.bearer_auth(api_key);
            }

            match request.send().await {
                Ok(response) if response.status().as_u16() == 500 => {
                    last_err = "API returned 500".to_string();
                }
                Ok(response) => {
                    let status = response.status();
                    let parsed: Value = response.json().await.map_err(|e| {
                        VendError::InvalidResponse(format!("non-JSON body (HTTP {status}): {e}"))
                    })?;
                    return Ok(parsed);
                }
                Err(error) => {
                    last_err = error.to_string();
                }
            }
            if attempt < TRANSPORT_RETRIES {
                tracing::warn!(
                    attempt = attempt + 1,
                    wait_s = delay.as_secs(),
                    error = %last_err,
                    "LLM transport error, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
        Err(VendError::Llm(format!(
            "request failed after {TRANSPORT_RETRIES} retries: {last_err}"
        )))
    }

    fn parse_usage(response: &Value) -> Option<TokenUsage> {
        let usage = response.get("usage")?.as_object()?;
        Some(TokenUsage::new(
            usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
            usage
                .get("completion_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
        ))
    }

    fn parse_choice(config: &ModelConfig, response: Value) -> Result<AssistantMessage> {
        let usage = Self::parse_usage(&response);
        let cost = usage.map(|u| config.response_cost(u));

        let choice = response
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .cloned()
            .ok_or_else(|| {
                tracing::error!(response = %response, "response has no choices");
                VendError::InvalidResponse("missing choices[0]".into())
            })?;
        let message = choice
            .get("message")
            .ok_or_else(|| VendError::InvalidResponse("missing choices[0].message".into()))?;
        if message.get("role").and_then(Value::as_str) != Some("assistant") {
            return Err(VendError::InvalidResponse(
                "the response should be an assistant message".into(),
            ));
        }

        let content = message
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string);
        let tool_calls: Vec<ToolCall> = message
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| {
                        let function = call.get("function")?;
                        let name = function.get("name").and_then(Value::as_str)?.to_string();
                        let arguments = function
                            .get("arguments")
                            .and_then(Value::as_str)
                            .filter(|raw| !raw.is_empty())
                            .and_then(|raw| serde_json::from_str::<JsonMap>(raw).ok())
                            .unwrap_or_default();
                        Some(ToolCall {
                            id: call.get("id").and_then(Value::as_str).map(str::to_string),
                            name,
                            arguments,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(AssistantMessage {
            content,
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            cost,
            usage,
            raw_data: Some(choice),
        })
    }
}

#[async_trait]
impl LlmService for HttpLlm {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantMessage> {
        let config = self.models.get(&request.model)?;
        let mut formatted = Self::format_messages(&request.messages);
        if request.enable_prompt_caching {
            Self::apply_cache_markers(&config.name, &mut formatted);
        }
        let body = Self::build_body(config, &request, formatted);
        let response = self.post_with_retries(config, &body).await?;
        Self::parse_choice(config, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelPricing;
    use crate::message::UserMessage;

    fn claude_config() -> ModelConfig {
        ModelConfig {
            name: "claude-sonnet".into(),
            cost_1m_token_dollar: Some(ModelPricing {
                prompt_price: 3.0,
                completion_price: 15.0,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn cache_markers_only_touch_last_three_text_messages() {
        let messages: Vec<Message> = (0..5)
            .map(|i| {
                Message::User(UserMessage {
                    content: format!("turn {i}"),
                    cost: None,
                    usage: None,
                })
            })
            .collect();
        let mut formatted = HttpLlm::format_messages(&messages);
        HttpLlm::apply_cache_markers("claude-sonnet", &mut formatted);
        assert!(formatted[1]["content"].is_string());
        for entry in &formatted[2..] {
            assert!(entry["content"].is_array(), "cache block expected: {entry}");
        }

        let mut plain = HttpLlm::format_messages(&messages);
        HttpLlm::apply_cache_markers("gpt-4.1", &mut plain);
        assert!(plain.iter().all(|m| m["content"].is_string()));
    }

    #[test]
    fn parse_choice_extracts_tool_calls_and_cost() {
        let response = serde_json::json!({
            "usage": { "prompt_tokens": 1000, "completion_tokens": 100 },
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "function": {
                            "name": "pay_delivery_order",
                            "arguments": "{\"order_id\": \"OT1\"}",
                        },
                    }],
                },
            }],
        });
        let message = HttpLlm::parse_choice(&claude_config(), response).unwrap();
        assert!(message.is_tool_call());
        let calls = message.tool_calls.unwrap();
        assert_eq!(calls[0].name, "pay_delivery_order");
        assert_eq!(calls[0].arguments["order_id"], "OT1");
        let cost = message.cost.unwrap();
        assert!((cost - (3.0 * 1000.0 + 15.0 * 100.0) / 1_000_000.0).abs() < 1e-12);
    }

    #[test]
    fn parse_choice_rejects_missing_choices() {
        let err = HttpLlm::parse_choice(&claude_config(), serde_json::json!({})).unwrap_err();
        assert!(matches!(err, VendError::InvalidResponse(_)));
    }
}
