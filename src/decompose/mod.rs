//! Task decomposition
//!
//! Asks an external chat-completion service to split a task name into subtask names.

mod client;
mod error;
mod parse;
mod transport;

pub use client::{
    build_prompt, extract_reply, Decomposer, DecomposerConfig, RetryPolicy, DEFAULT_API_URL,
    DEFAULT_MODEL, PROMPT_TEMPLATE, SYSTEM_INSTRUCTION,
};
pub use error::DecomposeError;
pub use parse::parse_reply;
pub use transport::{ChatMessage, ChatRequest, HttpTransport, Transport};
