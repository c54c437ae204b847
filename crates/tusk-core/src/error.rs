//! Error types for Tusk Core
//!
//! We use `thiserror` for ergonomic error definitions with automatic
//! Display/Error implementations. Store errors are recoverable: command
//! handlers render them as plain text, none of them terminate the process.

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors produced by the entity store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No project matched the given id, shortcut or prefix
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// No task matched the given id or prefix
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// An id prefix matched more than one project
    #[error("ambiguous project ID prefix: {prefix} (matches {count} projects)")]
    AmbiguousProject { prefix: String, count: usize },

    /// An id prefix matched more than one task
    #[error("ambiguous task ID prefix: {prefix} (matches {count} tasks)")]
    AmbiguousTask { prefix: String, count: usize },

    /// Shortcut failed the format check
    #[error("invalid shortcut: must be 1-20 alphanumeric characters or hyphens")]
    InvalidShortcut,

    /// Shortcut is held by a different live project
    #[error("shortcut already in use by project: {0}")]
    ShortcutInUse(String),

    /// Underlying filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True when the error means "entity absent" rather than a real fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::ProjectNotFound(_) | StoreError::TaskNotFound(_)
        )
    }
}
