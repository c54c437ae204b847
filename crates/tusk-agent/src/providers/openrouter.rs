//! OpenRouter backend
//!
//! Speaks the OpenAI-compatible chat/completions format with function
//! tools. OpenRouter reports request cost in its usage block, so this is
//! the provider with full session-cost accounting.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::backend::{BackendReply, ChatBackend};
use crate::types::{Message, ToolCall, ToolSpec, Usage};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenRouter chat backend
pub struct OpenRouterBackend {
    name: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    http_client: reqwest::Client,
}

impl OpenRouterBackend {
    pub fn new(api_key: String, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            name: format!("OpenRouter ({model})"),
            api_key,
            model,
            max_tokens: 8192,
            temperature: 0.7,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build from `OPENROUTER_API_KEY`, honoring the `OPENROUTER_MODEL`
    /// override. `None` when the key is absent.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY").ok()?;
        let model =
            std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self::new(api_key, model))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl std::fmt::Debug for OpenRouterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterBackend")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<BackendReply> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools: tools.iter().map(WireTool::from).collect(),
        };

        let response = self
            .http_client
            .post(OPENROUTER_API_URL)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/tusk-tools/tusk")
            .header("X-Title", "Tusk")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenRouter")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenRouter API error ({}): {}", status, error_text);
        }

        let completion: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenRouter response")?;

        // Some gateways return 200 with the error in the body
        if let Some(err) = completion.error {
            anyhow::bail!("OpenRouter API error: {} (code: {})", err.message, err.code);
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no response from model"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let arguments = match serde_json::from_str(&tc.function.arguments) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) | Err(_) => {
                        warn!(tool = %tc.function.name, "unparseable tool arguments");
                        Map::new()
                    }
                };
                ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                }
            })
            .collect();

        let usage = completion
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
                cost: u.cost,
            })
            .unwrap_or_default();

        Ok(BackendReply {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_default(),
            usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    /// `null` on assistant tool-call replies, hence the Option
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content.clone()),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: Value::Object(tc.arguments.clone()).to_string(),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// Arguments arrive and leave as a JSON-encoded string
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

impl From<&ToolSpec> for WireTool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters_schema(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
    #[serde(default)]
    cost: f64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolParam;

    #[test]
    fn zero_param_tool_serializes_without_parameters() {
        let spec = ToolSpec {
            name: "projects".into(),
            description: "List all projects".into(),
            params: None,
        };
        let wire = WireTool::from(&spec);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["type"], "function");
        assert!(json["function"].get("parameters").is_none());
    }

    #[test]
    fn tool_with_params_serializes_schema() {
        let spec = ToolSpec {
            name: "done".into(),
            description: "Mark a task as done".into(),
            params: Some(vec![ToolParam {
                name: "task_id".into(),
                description: "The task".into(),
                required: true,
            }]),
        };
        let json = serde_json::to_value(WireTool::from(&spec)).unwrap();
        assert_eq!(json["function"]["parameters"]["type"], "object");
        assert_eq!(
            json["function"]["parameters"]["required"],
            serde_json::json!(["task_id"])
        );
    }

    #[test]
    fn assistant_tool_calls_round_trip_as_strings() {
        let mut args = Map::new();
        args.insert("name".into(), Value::String("Work".into()));
        let msg = Message {
            role: crate::types::Role::Assistant,
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call-1".into(),
                name: "project".into(),
                arguments: args,
            }],
            tool_call_id: None,
        };
        let wire = WireMessage::from(&msg);
        assert_eq!(wire.tool_calls[0].kind, "function");
        let parsed: Value = serde_json::from_str(&wire.tool_calls[0].function.arguments).unwrap();
        assert_eq!(parsed["name"], "Work");
    }

    #[test]
    fn null_content_tool_call_reply_parses() {
        // OpenAI-compatible replies carry content: null on tool-call turns
        let body = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{"id": "call-1", "type": "function",
                        "function": {"name": "projects", "arguments": "{}"}}]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        let choice = &resp.choices[0];
        assert!(choice.message.content.is_none());
        assert_eq!(choice.message.tool_calls[0].function.name, "projects");
        assert_eq!(resp.usage.unwrap().prompt_tokens, 10);
    }

    #[test]
    fn error_body_with_numeric_code_parses() {
        let body = r#"{"error": {"message": "rate limited", "code": 429}}"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.message, "rate limited");
        assert_eq!(err.code, serde_json::json!(429));
    }
}
