//! Tusk Core - The domain engine for the Tusk terminal task manager
//!
//! Tusk Core provides the data model and durable storage layer shared by the
//! REPL and the chat assistant:
//!
//! 1. **Model** (`model`): Project and Task entities plus the duration scale
//! 2. **Store** (`store`): single-file JSON persistence with identifier
//!    resolution and a one-time legacy-id migration
//! 3. **Schedule** (`schedule`): pure calendar-date range queries over tasks
//!
//! # Design Principles
//!
//! 1. **Whole-document durability**: every mutation rewrites the full store
//!    file before the call returns; there is no partial update
//! 2. **Stable identifiers**: entities keep opaque UUID-class ids forever,
//!    humans and the assistant address them through shortcuts and prefixes
//! 3. **Testability**: the `Store` trait is the seam for fixture stores

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

pub mod error;
pub mod ids;
pub mod model;
pub mod schedule;
pub mod store;

pub use error::{Result, StoreError};
pub use model::{format_minutes, total_minutes, DurationClass, Project, Task};
pub use store::{JsonStore, Store};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
