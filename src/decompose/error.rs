//! Decomposition error types

use thiserror::Error;

/// Errors that can occur while asking the chat-completion service for subtasks
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("No API key configured (set DEEPSEEK_API_KEY)")]
    MissingCredential,

    #[error("Network/request error: {0}")]
    Transport(String),

    #[error("Response could not be parsed: {0}")]
    ResponseShape(String),

    #[error("Decomposition failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<DecomposeError>,
    },
}

impl DecomposeError {
    /// Check if this error is worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            DecomposeError::Transport(_) => true,
            DecomposeError::ResponseShape(_) => true,
            DecomposeError::MissingCredential => false,
            DecomposeError::Exhausted { .. } => false,
        }
    }

    /// The error that ended the last attempt, unwrapping `Exhausted`
    pub fn last_error(&self) -> &DecomposeError {
        match self {
            DecomposeError::Exhausted { last, .. } => last,
            other => other,
        }
    }
}

impl From<reqwest::Error> for DecomposeError {
    fn from(e: reqwest::Error) -> Self {
        DecomposeError::Transport(e.to_string())
    }
}
