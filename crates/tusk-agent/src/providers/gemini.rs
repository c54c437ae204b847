//! Gemini backend
//!
//! Talks to the `generateContent` REST endpoint. Gemini has no tool-call
//! ids and no cost field: call ids are the function names, and usage covers
//! tokens only. Consecutive tool results are folded into a single user
//! content, which is the shape the API expects after a multi-call turn.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::{BackendReply, ChatBackend};
use crate::types::{Message, Role, ToolCall, ToolSpec, Usage};

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini chat backend
pub struct GeminiBackend {
    name: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    http_client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            name: format!("Gemini ({model})"),
            api_key,
            model,
            max_tokens: 8192,
            temperature: 0.7,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build from `GEMINI_API_KEY`, honoring the `GEMINI_MODEL` override.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok()?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
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

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        )
    }
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<BackendReply> {
        let request = build_request(messages, tools, self.max_tokens, self.temperature);

        let response = self
            .http_client
            .post(self.endpoint())
            .timeout(REQUEST_TIMEOUT)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let completion: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let candidate = completion
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no response from model"))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall {
                    // Gemini has no call ids; the name doubles as one
                    id: call.name.clone(),
                    name: call.name,
                    arguments: call.args,
                });
            }
        }

        let usage = completion
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
                cost: 0.0,
            })
            .unwrap_or_default();

        Ok(BackendReply {
            text,
            tool_calls,
            finish_reason: candidate.finish_reason.unwrap_or_default(),
            usage,
        })
    }
}

/// Map the neutral history onto Gemini's content/part shapes. System
/// messages become the system instruction; tool results become
/// `functionResponse` parts addressed by function name.
fn build_request(
    messages: &[Message],
    tools: &[ToolSpec],
    max_tokens: u32,
    temperature: f32,
) -> GenerateRequest {
    let mut system_text = String::new();
    let mut contents: Vec<GeminiContent> = Vec::new();

    // tool_call_id -> function name, learned from assistant turns
    let mut call_names: HashMap<&str, &str> = HashMap::new();
    for msg in messages {
        for call in &msg.tool_calls {
            call_names.insert(call.id.as_str(), call.name.as_str());
        }
    }

    for msg in messages {
        match msg.role {
            Role::System => {
                if !system_text.is_empty() {
                    system_text.push('\n');
                }
                system_text.push_str(&msg.content);
            }
            Role::User => contents.push(GeminiContent {
                role: "user".into(),
                parts: vec![GeminiPart::text(&msg.content)],
            }),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !msg.content.is_empty() {
                    parts.push(GeminiPart::text(&msg.content));
                }
                for call in &msg.tool_calls {
                    parts.push(GeminiPart {
                        function_call: Some(GeminiFunctionCall {
                            name: call.name.clone(),
                            args: call.arguments.clone(),
                        }),
                        ..GeminiPart::default()
                    });
                }
                if !parts.is_empty() {
                    contents.push(GeminiContent {
                        role: "model".into(),
                        parts,
                    });
                }
            }
            Role::Tool => {
                let name = msg
                    .tool_call_id
                    .as_deref()
                    .and_then(|id| call_names.get(id).copied())
                    .or(msg.tool_call_id.as_deref())
                    .unwrap_or_default()
                    .to_string();
                let part = GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        name,
                        response: serde_json::json!({ "result": msg.content }),
                    }),
                    ..GeminiPart::default()
                };
                // Fold consecutive tool results into one user content
                match contents.last_mut() {
                    Some(last) if last.role == "user" && last.is_tool_results() => {
                        last.parts.push(part)
                    }
                    _ => contents.push(GeminiContent {
                        role: "user".into(),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    let declarations: Vec<GeminiFunctionDecl> = tools
        .iter()
        .map(|spec| GeminiFunctionDecl {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.parameters_schema(),
        })
        .collect();

    GenerateRequest {
        system_instruction: (!system_text.is_empty()).then(|| GeminiSystemInstruction {
            parts: vec![GeminiPart::text(&system_text)],
        }),
        contents,
        tools: (!declarations.is_empty()).then(|| {
            vec![GeminiToolDecl {
                function_declarations: declarations,
            }]
        }),
        generation_config: GeminiGenerationConfig {
            temperature,
            max_output_tokens: max_tokens,
        },
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<GeminiSystemInstruction>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiToolDecl>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

// Blocked or empty candidates arrive without parts, so reads default
#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn is_tool_results(&self) -> bool {
        self.parts.iter().all(|p| p.function_response.is_some())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "functionCall"
    )]
    function_call: Option<GeminiFunctionCall>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "functionResponse"
    )]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(content: &str) -> Self {
        Self {
            text: Some(content.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
struct GeminiToolDecl {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDecl>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDecl {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(default, rename = "promptTokenCount")]
    prompt_token_count: u64,
    #[serde(default, rename = "candidatesTokenCount")]
    candidates_token_count: u64,
    #[serde(default, rename = "totalTokenCount")]
    total_token_count: u64,
}
