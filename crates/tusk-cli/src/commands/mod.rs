//! Command set
//!
//! Each module registers its commands into the shared [`Registry`]. The
//! registry is built once at startup and passed around explicitly; nothing
//! here is process-global.

pub mod chat;
pub mod meta;
pub mod project;
pub mod schedule;
pub mod shortcut;
pub mod task;

use crate::registry::Registry;

/// Build the full command table
pub fn build_registry() -> Registry {
    let mut registry = Registry::new();
    project::register(&mut registry);
    task::register(&mut registry);
    schedule::register(&mut registry);
    shortcut::register(&mut registry);
    chat::register(&mut registry);
    meta::register(&mut registry);
    registry
}
