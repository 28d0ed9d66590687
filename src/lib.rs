//! todotree library crate
//!
//! A to-do list kept as a tree of tasks, persisted as one JSON snapshot, with
//! leaf tasks expandable into subtasks by a chat-completion service.

pub mod cli;
pub mod config;
pub mod decompose;
pub mod manager;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use decompose::{DecomposeError, Decomposer, DecomposerConfig};
pub use manager::{Core, CoreError};
pub use models::{Task, TaskId};
pub use store::{resolve_storage_path, Store, StoreError};
