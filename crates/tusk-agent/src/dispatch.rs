//! Seams between the engine and the command layer
//!
//! The engine never sees the command registry directly. The CLI hands it a
//! [`ToolDispatcher`] that owns schema generation, destructive-action
//! metadata and execution, plus a [`Confirmer`] for the interactive yes/no
//! gate. Both are trivial to script in tests.

use serde_json::{Map, Value};

use crate::types::ToolSpec;

/// Executes tool calls against the local command set
pub trait ToolDispatcher: Send + Sync {
    /// Schemas for every command the model may call
    fn tool_specs(&self) -> Vec<ToolSpec>;

    /// Whether this command irreversibly deletes data
    fn is_destructive(&self, name: &str) -> bool;

    /// Human-readable description of what a destructive call would remove,
    /// e.g. `project 'Work' and its 3 task(s)`
    fn describe_destructive(&self, name: &str, args: &Map<String, Value>) -> String;

    /// Run the command and return its captured textual output. Errors are
    /// rendered into the returned text, not raised: a failed tool call is
    /// feedback for the model, not the end of the turn.
    fn execute(&self, name: &str, args: &Map<String, Value>) -> String;
}

/// Interactive yes/no gate for destructive tool calls
pub trait Confirmer: Send + Sync {
    fn confirm(&self, description: &str) -> bool;
}
