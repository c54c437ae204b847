//! Tusk Agent - LLM integration for the Tusk task manager
//!
//! The chat surface is built from three seams:
//!
//! - [`backend::ChatBackend`]: the abstract request/response contract a
//!   model provider must satisfy; OpenRouter and Gemini implementations
//!   live under [`providers`]
//! - [`dispatch::ToolDispatcher`] / [`dispatch::Confirmer`]: how emitted
//!   tool calls reach local command handlers, and how destructive ones get
//!   gated behind a yes/no prompt
//! - [`session::ChatSession`]: the conversation state machine that shuttles
//!   tool calls between the two until the model produces a final answer
//!
//! The engine never touches a vendor wire format; providers translate the
//! neutral [`types`] to and from their own request shapes.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

pub mod backend;
pub mod dispatch;
pub mod error;
pub mod providers;
pub mod session;
pub mod types;

pub use backend::{BackendReply, ChatBackend};
pub use dispatch::{Confirmer, ToolDispatcher};
pub use error::AgentError;
pub use providers::{GeminiBackend, OpenRouterBackend};
pub use session::{ChatSession, SessionUsage, MAX_TOOL_ROUNDS};
pub use types::{ChatOutcome, Message, Role, ToolCall, ToolParam, ToolSpec, Usage};
