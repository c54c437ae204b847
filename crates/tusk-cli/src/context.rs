//! Shared state threaded through every command handler
//!
//! No package-level globals: the store, registry, runtime handle and chat
//! state are built once in `main` and passed by reference, which keeps the
//! handlers runnable against fixture stores in tests.

use std::sync::Arc;

use tusk_agent::{ChatBackend, ChatSession};
use tusk_core::Store;

use crate::registry::Registry;

/// Chat assistant state, present only when an API key was configured
pub struct ChatFeature {
    pub backend: Arc<dyn ChatBackend>,
    pub session: ChatSession,
}

impl std::fmt::Debug for ChatFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatFeature")
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

/// Everything a command handler may touch
pub struct CommandContext {
    pub store: Arc<dyn Store>,
    pub registry: Arc<Registry>,
    /// Handle into the process-wide runtime; chat blocks on it for the
    /// duration of a turn
    pub runtime: tokio::runtime::Handle,
    pub chat: Option<ChatFeature>,
    /// Verbose tool-call tracing for chat turns
    pub debug: bool,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("chat", &self.chat.is_some())
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
