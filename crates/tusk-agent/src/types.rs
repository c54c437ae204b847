//! Wire-neutral conversation types
//!
//! These are the only shapes the engine understands. Each provider maps
//! them to its own request/response format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One entry of the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Function calls the assistant asked for in this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For [`Role::Tool`] messages: the call this result answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A structured function call emitted by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// Schema of one callable command, as advertised to the model
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Ordered parameter list; `None` means the schema omits parameters
    /// entirely (commands with zero arguments)
    pub params: Option<Vec<ToolParam>>,
}

/// One string-typed tool parameter
#[derive(Debug, Clone)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ToolSpec {
    /// JSON Schema object for the parameter list, or `None` when the tool
    /// declares no parameters
    pub fn parameters_schema(&self) -> Option<Value> {
        let params = self.params.as_ref()?;
        let mut properties = Map::new();
        let mut required = Vec::new();
        for p in params {
            properties.insert(
                p.name.clone(),
                serde_json::json!({ "type": "string", "description": p.description }),
            );
            if p.required {
                required.push(Value::String(p.name.clone()));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        Some(Value::Object(schema))
    }
}

/// Token and cost accounting for one backend exchange
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost: f64,
}

impl Usage {
    pub fn accumulate(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        self.cost += other.cost;
    }

    pub fn is_zero(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0
    }
}

/// Final result of a chat turn, after the tool loop converged
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub text: String,
    pub finish_reason: String,
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_param_tool_omits_schema() {
        let spec = ToolSpec {
            name: "projects".into(),
            description: "List all projects".into(),
            params: None,
        };
        assert!(spec.parameters_schema().is_none());
    }

    #[test]
    fn parameters_schema_lists_required() {
        let spec = ToolSpec {
            name: "task".into(),
            description: "Add a task".into(),
            params: Some(vec![
                ToolParam {
                    name: "project_id".into(),
                    description: "The project".into(),
                    required: true,
                },
                ToolParam {
                    name: "note".into(),
                    description: "Optional note".into(),
                    required: false,
                },
            ]),
        };
        let schema = spec.parameters_schema().unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["project_id"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["project_id"]));
    }
}
