//! Abstract model backend contract
//!
//! The engine depends only on this trait: one request carrying the full
//! history plus tool schemas, one structured reply. The literal HTTP/JSON
//! shape of a vendor API is a provider concern.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Message, ToolCall, ToolSpec, Usage};

/// One parsed backend response
#[derive(Debug, Clone, Default)]
pub struct BackendReply {
    /// Narrated assistant text, possibly empty when only tools were called
    pub text: String,
    /// Structured function calls to execute before the next round
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: String,
    pub usage: Usage,
}

/// A language-model provider able to hold a tool-calling conversation.
///
/// Implementations must return `Err` for transport failures, non-success
/// statuses, API-level error bodies, and replies with no usable candidate —
/// never a silently empty `BackendReply`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Human-readable provider/model label for logs and warnings
    fn name(&self) -> &str;

    async fn send(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<BackendReply>;
}
